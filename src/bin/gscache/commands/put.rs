use std::path::Path;

use anyhow::{Context, Result};
use gscache::{Config, StoreOutcome};

use crate::common::client;

pub fn run(config: Config, local: &Path, url: &str, overwrite: bool) -> Result<()> {
    let client = client(config)?;
    let outcome = client
        .put(local, url, overwrite)
        .with_context(|| format!("Failed to upload {} to {url}", local.display()))?;
    if outcome == StoreOutcome::Replaced {
        println!("replaced {url}");
    }
    Ok(())
}
