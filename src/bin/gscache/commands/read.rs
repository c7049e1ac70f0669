use anyhow::{Context, Result};
use gscache::{Config, ReadOptions};

use crate::common::{TableArgs, client};

pub fn run(config: Config, table: &TableArgs, url: &str, force: bool) -> Result<()> {
    let client = client(config)?.with_codec(table.codec()?);
    let opts = ReadOptions {
        process: table.process.clone(),
        force,
    };
    let batch = client
        .read(url, &opts)
        .with_context(|| format!("Failed to read {url}"))?;
    table.print(&batch)
}
