use std::path::Path;

use anyhow::{Context, Result};
use gscache::{Config, StoreOutcome};

use crate::common::{TableArgs, client};

pub fn run(config: Config, table: &TableArgs, local: &Path, url: &str, overwrite: bool) -> Result<()> {
    let codec = table.codec()?;
    let batch = codec
        .decode(local, table.process.as_deref())
        .with_context(|| format!("Failed to parse {}", local.display()))?;
    let client = client(config)?.with_codec(codec);
    let outcome = client
        .write(&batch, url, overwrite)
        .with_context(|| format!("Failed to write {url}"))?;
    let verb = match outcome {
        StoreOutcome::Created => "written to",
        StoreOutcome::Replaced => "replaced",
    };
    println!("{} rows {verb} {url}", batch.num_rows());
    Ok(())
}
