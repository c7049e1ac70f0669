use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "gscache", about = "Cached tables on GCS: ls/stale/get/read/read-many/put/write/config")]
struct Cli {
    #[command(flatten)]
    global: common::GlobalArgs,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List objects matching gs:// patterns (glob and brace syntax allowed)
    Ls {
        #[arg(short = 'l', long = "long")]
        long: bool,
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Report whether cached copies are missing, stale or fresh
    Stale {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Make sure an object is cached and print its local path
    Get {
        #[arg(long)]
        force: bool,
        url: String,
    },

    /// Read one table and print it
    Read {
        #[command(flatten)]
        table: common::TableArgs,
        #[arg(long)]
        force: bool,
        url: String,
    },

    /// Read every table matching the patterns
    ReadMany {
        #[command(flatten)]
        table: common::TableArgs,
        #[arg(long, value_enum, default_value_t = CombineArg::None)]
        combine: CombineArg,
        /// Decode on this many threads
        #[arg(long)]
        workers: Option<usize>,
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Upload a local file as is
    Put {
        #[arg(long)]
        overwrite: bool,
        local: PathBuf,
        url: String,
    },

    /// Parse a local CSV file and store it, compressing when the url asks for it
    Write {
        #[command(flatten)]
        table: common::TableArgs,
        #[arg(long)]
        overwrite: bool,
        local: PathBuf,
        url: String,
    },

    /// Show the resolved CLI and cache root
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CombineArg {
    None,
    Rows,
    Cols,
}

impl From<CombineArg> for gscache::Combine {
    fn from(c: CombineArg) -> Self {
        match c {
            CombineArg::None => gscache::Combine::None,
            CombineArg::Rows => gscache::Combine::Rows,
            CombineArg::Cols => gscache::Combine::Cols,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::init_logger(cli.global.verbose);
    let config = cli.global.config()?;
    match cli.cmd {
        Commands::Ls { long, patterns } => commands::ls::run(config, long, &patterns),
        Commands::Stale { urls } => commands::stale::run(config, &urls),
        Commands::Get { force, url } => commands::get::run(config, &url, force),
        Commands::Read { table, force, url } => commands::read::run(config, &table, &url, force),
        Commands::ReadMany {
            table,
            combine,
            workers,
            patterns,
        } => commands::read_many::run(config, &table, &patterns, combine.into(), workers),
        Commands::Put {
            overwrite,
            local,
            url,
        } => commands::put::run(config, &local, &url, overwrite),
        Commands::Write {
            table,
            overwrite,
            local,
            url,
        } => commands::write::run(config, &table, &local, &url, overwrite),
        Commands::Config => commands::config::run(config),
    }
}

mod commands;
mod common;
