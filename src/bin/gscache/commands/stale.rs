use anyhow::Result;
use gscache::{CacheState, Config};

use crate::common::client;

pub fn run(config: Config, urls: &[String]) -> Result<()> {
    let client = client(config)?;
    for url in urls {
        let local = client.local_path(url)?;
        let verdict = if !local.is_file() {
            "missing"
        } else {
            match client.cache_state(url)? {
                CacheState::NeedsFetch => "stale",
                CacheState::Cached => "fresh",
            }
        };
        println!("{verdict}\t{url}");
    }
    Ok(())
}
