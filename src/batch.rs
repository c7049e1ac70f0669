//! # Batch Fetch
//!
//! Reads every object matching a set of patterns:
//! 1. one listing call resolves the patterns;
//! 2. each object is checked against its cached copy;
//! 3. pending objects are transferred (bulk where possible);
//! 4. every object is decoded, optionally transformed, and
//! 5. the tables are returned keyed by path or combined.
//!
//! A bulk `cp` into one directory cannot keep two objects with the same
//! basename apart, so when pending objects span several remote directories
//! only the basename-unique ones go through a bulk copy (into a staging
//! directory) and the colliding ones are copied one by one.

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::{self, CacheState};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::gcs::path::{basename, parent};
use crate::gcs::storage::Storage;
use crate::table::{concat_cols, concat_rows};

/// Per-file transform applied after decoding. Receives the table and the
/// remote path it came from.
pub type Transform<'a> = &'a (dyn Fn(RecordBatch, &str) -> anyhow::Result<RecordBatch> + Sync);

/// How the per-file tables are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combine {
    /// Keyed by remote path, in listing order.
    #[default]
    None,
    /// Rows stacked in listing order.
    Rows,
    /// Columns placed side by side in listing order.
    Cols,
}

#[derive(Clone, Default)]
pub struct BatchOptions<'a> {
    pub combine: Combine,
    pub transform: Option<Transform<'a>>,
    /// Shell command every file is piped through before parsing.
    pub process: Option<String>,
    /// Decode on a pool of this many threads; `None` or 1 decodes in order
    /// on the calling thread.
    pub workers: Option<usize>,
}

/// Tables keyed by remote path, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Tables(Vec<(String, RecordBatch)>);

impl Tables {
    pub fn get(&self, path: &str) -> Option<&RecordBatch> {
        self.0.iter().find(|(p, _)| p == path).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordBatch)> {
        self.0.iter().map(|(p, t)| (p.as_str(), t))
    }

    pub fn into_inner(self) -> Vec<(String, RecordBatch)> {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum BatchOutput {
    Tables(Tables),
    Table(RecordBatch),
}

impl BatchOutput {
    pub fn into_table(self) -> Option<RecordBatch> {
        match self {
            BatchOutput::Table(t) => Some(t),
            BatchOutput::Tables(_) => None,
        }
    }

    pub fn into_tables(self) -> Option<Tables> {
        match self {
            BatchOutput::Tables(t) => Some(t),
            BatchOutput::Table(_) => None,
        }
    }
}

/// A remote object and where it lives in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub remote: String,
    pub local: PathBuf,
}

/// Splits `pending` into objects whose basename is unique within the set
/// and objects that share a basename with another one. Order is kept.
pub fn partition_by_basename(pending: &[Target]) -> (Vec<Target>, Vec<Target>) {
    let counts = pending.iter().counts_by(|t| basename(&t.remote));
    pending
        .iter()
        .cloned()
        .partition(|t| counts.get(basename(&t.remote)) == Some(&1))
}

/// Staging directory for bulk copies; removed on drop.
struct Staging {
    dir: PathBuf,
}

impl Staging {
    fn create(cache_root: &Path) -> Result<Staging> {
        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let dir = cache_root.join(format!(".staging_{}_{}", ts, std::process::id()));
        fs::create_dir_all(&dir)?;
        Ok(Staging { dir })
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

impl<S: Storage> Client<S> {
    /// Reads every object matching `patterns`.
    ///
    /// Zero matches is not an error: a warning is logged and an empty result
    /// returned. A failure on any single file fails the whole call with
    /// [`Error::PerFile`].
    pub fn read_many<P: AsRef<str>>(&self, patterns: &[P], opts: &BatchOptions) -> Result<BatchOutput> {
        let tables = self.collect_tables(patterns, opts)?;
        Ok(match opts.combine {
            Combine::None => BatchOutput::Tables(Tables(tables)),
            Combine::Rows => BatchOutput::Table(concat_rows(&batches(tables))?),
            Combine::Cols => BatchOutput::Table(concat_cols(&batches(tables))?),
        })
    }

    /// Reads, transforms and stacks rows of every matching object.
    pub fn read_rows<P: AsRef<str>>(
        &self,
        patterns: &[P],
        transform: Transform<'_>,
        workers: Option<usize>,
    ) -> Result<RecordBatch> {
        concat_rows(&self.read_transformed(patterns, transform, workers)?)
    }

    /// Reads, transforms and joins columns of every matching object.
    pub fn read_cols<P: AsRef<str>>(
        &self,
        patterns: &[P],
        transform: Transform<'_>,
        workers: Option<usize>,
    ) -> Result<RecordBatch> {
        concat_cols(&self.read_transformed(patterns, transform, workers)?)
    }

    fn read_transformed<P: AsRef<str>>(
        &self,
        patterns: &[P],
        transform: Transform<'_>,
        workers: Option<usize>,
    ) -> Result<Vec<RecordBatch>> {
        let opts = BatchOptions {
            transform: Some(transform),
            workers,
            ..BatchOptions::default()
        };
        Ok(batches(self.collect_tables(patterns, &opts)?))
    }

    /// Lists, transfers and decodes; an empty vector when nothing matched.
    fn collect_tables<P: AsRef<str>>(
        &self,
        patterns: &[P],
        opts: &BatchOptions,
    ) -> Result<Vec<(String, RecordBatch)>> {
        let paths = self.list(patterns)?;
        if paths.is_empty() {
            let shown = patterns.iter().map(|p| p.as_ref()).join(", ");
            warn!("No objects matched {shown}");
            return Ok(Vec::new());
        }

        let root = self.cache_root()?;
        let targets: Vec<Target> = paths
            .into_iter()
            .map(|remote| Target {
                local: cache::local_path(&root, &remote),
                remote,
            })
            .collect();

        let pending: Vec<Target> = targets
            .iter()
            .filter(|t| self.needs_fetch(t))
            .cloned()
            .collect();
        info!(
            "{} objects matched, {} cached, {} to download",
            targets.len(),
            targets.len() - pending.len(),
            pending.len()
        );
        if !pending.is_empty() {
            self.transfer(&root, &pending)?;
        }
        self.decode_all(&targets, opts)
    }

    /// Absent, stale, or unknown (the check itself failed) all mean download.
    fn needs_fetch(&self, t: &Target) -> bool {
        match cache::cache_state(self.storage(), &t.remote, &t.local) {
            Ok(CacheState::Cached) => {
                info!("Using cached copy of {}", t.remote);
                false
            }
            Ok(CacheState::NeedsFetch) => true,
            Err(e) => {
                warn!("Cannot check {} against its cached copy ({e}); downloading it", t.remote);
                true
            }
        }
    }

    fn transfer(&self, root: &Path, pending: &[Target]) -> Result<()> {
        let single_dir = pending.iter().map(|t| parent(&t.remote)).all_equal();
        if single_dir {
            let dest = match pending[0].local.parent() {
                Some(p) => p.to_path_buf(),
                None => root.to_path_buf(),
            };
            fs::create_dir_all(&dest)?;
            let sources: Vec<String> = pending.iter().map(|t| t.remote.clone()).collect();
            return self.storage().download_many(&sources, &dest);
        }

        let (unique, colliding) = partition_by_basename(pending);
        if !unique.is_empty() {
            let staging = Staging::create(root)?;
            let sources: Vec<String> = unique.iter().map(|t| t.remote.clone()).collect();
            self.storage().download_many(&sources, &staging.dir)?;
            for t in &unique {
                if let Some(p) = t.local.parent() {
                    fs::create_dir_all(p)?;
                }
                fs::rename(staging.dir.join(basename(&t.remote)), &t.local)?;
            }
        }
        for t in &colliding {
            if let Some(p) = t.local.parent() {
                fs::create_dir_all(p)?;
            }
            self.storage().download(&t.remote, &t.local)?;
        }
        Ok(())
    }

    fn decode_all(&self, targets: &[Target], opts: &BatchOptions) -> Result<Vec<(String, RecordBatch)>> {
        let decode_one = |t: &Target| -> Result<(String, RecordBatch)> {
            let table = self
                .decode_target(t, opts)
                .map_err(|e| Error::PerFile {
                    path: t.remote.clone(),
                    source: Box::new(e),
                })?;
            Ok((t.remote.clone(), table))
        };

        match opts.workers {
            Some(n) if n > 1 && targets.len() > 1 => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
                pool.install(|| targets.par_iter().map(decode_one).collect())
            }
            _ => targets.iter().map(decode_one).collect(),
        }
    }

    fn decode_target(&self, t: &Target, opts: &BatchOptions) -> Result<RecordBatch> {
        let table = self.codec().decode(&t.local, opts.process.as_deref())?;
        match opts.transform {
            Some(f) => Ok(f(table, &t.remote)?),
            None => Ok(table),
        }
    }
}

fn batches(tables: Vec<(String, RecordBatch)>) -> Vec<RecordBatch> {
    tables.into_iter().map(|(_, t)| t).collect()
}
