use anyhow::Result;
use gscache::Config;
use gscache::gcs::{FileInfo, Storage};

use crate::common::{client, print_table};

pub fn run(config: Config, long: bool, patterns: &[String]) -> Result<()> {
    let client = client(config)?;
    let paths = client.list(patterns)?;
    if !long {
        for p in paths {
            println!("{p}");
        }
        return Ok(());
    }

    let mut rows: Vec<[String; 3]> = Vec::new();
    for p in &paths {
        for line in client.storage().list_long(p)? {
            let info = FileInfo::from_long_line(&line)?;
            let size = info
                .size
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            rows.push([size, info.updated.format("%Y-%m-%dT%H:%M").to_string(), info.name]);
        }
    }
    print_table(&["SIZE", "UPDATED", "NAME"], &rows);
    Ok(())
}
