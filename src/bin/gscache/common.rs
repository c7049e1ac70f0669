use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Args;
use gscache::{Client, Config, CsvOptions, TableCodec};

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// gcloud or gsutil executable
    #[arg(long, global = true)]
    pub cli: Option<PathBuf>,
    /// Local cache root
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
    /// TOML file with cli_path and cache_root
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// -v for info, -vv for debug
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Flags win over the environment, which wins over the config file.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::default();
        if let Some(p) = &self.cli {
            config.set_cli_path(p);
        }
        if let Some(p) = &self.cache_dir {
            config.set_cache_root(p);
        }
        let mut config = config.or(Config::from_env());
        if let Some(path) = &self.config {
            let file = Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config = config.or(file);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct TableArgs {
    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
    /// Shell command the text is piped through before parsing
    #[arg(long)]
    pub process: Option<String>,
    /// Print at most this many rows
    #[arg(long)]
    pub head: Option<usize>,
}

impl TableArgs {
    pub fn codec(&self) -> Result<TableCodec> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character: {:?}", self.delimiter);
        }
        Ok(TableCodec {
            csv: CsvOptions::default().with_delimiter(self.delimiter as u8),
            ..TableCodec::default()
        })
    }

    pub fn print(&self, batch: &RecordBatch) -> Result<()> {
        let rows = batch.num_rows();
        let n = self.head.map_or(rows, |h| h.min(rows));
        println!("{}", pretty_format_batches(&[batch.slice(0, n)])?);
        if n < rows {
            println!("... {rows} rows total");
        }
        Ok(())
    }
}

pub fn client(config: Config) -> Result<Client> {
    Client::new(config).context("Failed to locate the Google Cloud CLI")
}

pub fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub fn print_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) {
    let mut widths = [0usize; N];
    for (i, h) in headers.iter().enumerate() {
        widths[i] = widths[i].max(display_width(h));
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{:width$}", c, width = *w))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };
    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|w| "-".repeat(*w)).collect());
    for row in rows {
        line(row.to_vec());
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}
