use anyhow::{Context, Result};
use gscache::Config;

use crate::common::client;

pub fn run(config: Config, url: &str, force: bool) -> Result<()> {
    let client = client(config)?;
    let local = client
        .fetch(url, force)
        .with_context(|| format!("Failed to fetch {url}"))?;
    println!("{}", local.display());
    Ok(())
}
