use anyhow::Result;
use gscache::Config;
use gscache::gcs::CliFlavor;

use crate::common::{client, print_table};

pub fn run(config: Config) -> Result<()> {
    let client = client(config)?;
    let flavor = match client.storage().flavor() {
        CliFlavor::Gcloud => "gcloud storage",
        CliFlavor::Gsutil => "gsutil",
    };
    let rows = [
        ["cli".to_string(), client.storage().program().display().to_string()],
        ["flavor".to_string(), flavor.to_string()],
        ["cache_root".to_string(), client.cache_root()?.display().to_string()],
    ];
    print_table(&["KEY", "VALUE"], &rows);
    Ok(())
}
