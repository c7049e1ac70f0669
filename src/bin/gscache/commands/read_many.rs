use anyhow::Result;
use gscache::{BatchOptions, BatchOutput, Combine, Config};

use crate::common::{TableArgs, client};

pub fn run(
    config: Config,
    table: &TableArgs,
    patterns: &[String],
    combine: Combine,
    workers: Option<usize>,
) -> Result<()> {
    let client = client(config)?.with_codec(table.codec()?);
    let opts = BatchOptions {
        combine,
        transform: None,
        process: table.process.clone(),
        workers,
    };
    match client.read_many(patterns, &opts)? {
        BatchOutput::Table(batch) => table.print(&batch)?,
        BatchOutput::Tables(tables) => {
            for (path, batch) in tables.iter() {
                println!("==> {path} <==");
                table.print(batch)?;
            }
        }
    }
    Ok(())
}
