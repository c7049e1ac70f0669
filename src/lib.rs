// # gscache: cached tables on Google Cloud Storage
//
// Reads and writes delimited-text tables stored in GCS buckets by driving the
// `gcloud storage` (or legacy `gsutil`) command line tool. Remote objects are
// mirrored under a local cache root and only re-downloaded when the remote
// copy is newer. Tables are Arrow `RecordBatch`es.
//
// The entry point is [`Client`]: single-file `read`/`write`/`put` live in
// `client`, multi-file `read_many` in `batch`.

pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gcs;
pub mod runner;
pub mod table;

#[cfg(test)]
mod testing;

pub use batch::{BatchOptions, BatchOutput, Combine, Tables};
pub use cache::CacheState;
pub use client::{Client, ReadOptions, StoreOutcome};
pub use config::Config;
pub use error::{Error, Operation, Result, ValidationRule};
pub use gcs::{GcloudCli, Storage};
pub use table::{Compression, CsvOptions, TableCodec};
