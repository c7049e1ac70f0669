//! # Client
//!
//! Single-file workflows: listing, cache-aware fetch and read, and
//! write/upload with overwrite protection. A [`Client`] owns its
//! [`Config`], its [`Storage`] backend and the [`TableCodec`] used to turn
//! files into tables.

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::{self, CacheState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gcs::cli::GcloudCli;
use crate::gcs::path::{validate_path, validate_paths};
use crate::gcs::storage::Storage;
use crate::table::TableCodec;

/// Options for reading one remote table.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Shell command the text is piped through before parsing. It reads
    /// stdin and writes stdout, e.g. `grep -v '^#'`.
    pub process: Option<String>,
    /// Always download, skipping the staleness check.
    pub force: bool,
}

/// What a store did to the remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Created,
    /// An existing object was overwritten.
    Replaced,
}

pub struct Client<S = GcloudCli> {
    storage: S,
    config: Config,
    codec: TableCodec,
}

impl Client<GcloudCli> {
    /// A client driving the CLI found by [`Config::resolve_cli_path`].
    pub fn new(config: Config) -> Result<Self> {
        let program = config.resolve_cli_path()?;
        Ok(Self::with_storage(GcloudCli::new(program), config))
    }
}

impl<S: Storage> Client<S> {
    pub fn with_storage(storage: S, config: Config) -> Self {
        Client {
            storage,
            config,
            codec: TableCodec::default(),
        }
    }

    pub fn with_codec(mut self, codec: TableCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &TableCodec {
        &self.codec
    }

    pub fn cache_root(&self) -> Result<PathBuf> {
        self.config.resolve_cache_root()
    }

    /// Where `path` is mirrored locally.
    pub fn local_path(&self, path: &str) -> Result<PathBuf> {
        Ok(cache::local_path(&self.cache_root()?, path))
    }

    /// Lists the objects matching `patterns` in one CLI call.
    ///
    /// Glob and brace expansion is left to the backend. Directory entries are
    /// dropped and duplicates removed, keeping first-seen order.
    pub fn list<P: AsRef<str>>(&self, patterns: &[P]) -> Result<Vec<String>> {
        validate_paths(patterns, true)?;
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        Ok(self
            .storage
            .list(&patterns)?
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && !l.ends_with('/'))
            .unique()
            .collect())
    }

    /// Cache state of one remote object.
    pub fn cache_state(&self, path: &str) -> Result<CacheState> {
        validate_path(path)?;
        let local = self.local_path(path)?;
        cache::cache_state(&self.storage, path, &local)
    }

    /// Makes sure an up-to-date copy of `path` is cached and returns its
    /// local path.
    pub fn fetch(&self, path: &str, force: bool) -> Result<PathBuf> {
        validate_path(path)?;
        let local = self.local_path(path)?;
        let state = if force {
            CacheState::NeedsFetch
        } else {
            cache::cache_state(&self.storage, path, &local)?
        };
        match state {
            CacheState::NeedsFetch => {
                if let Some(parent) = local.parent() {
                    fs::create_dir_all(parent)?;
                }
                self.storage.download(path, &local)?;
            }
            CacheState::Cached => {
                info!("Using cached copy of {path} at {}", local.display());
            }
        }
        Ok(local)
    }

    /// Fetches `path` if needed and decodes it.
    pub fn read(&self, path: &str, opts: &ReadOptions) -> Result<RecordBatch> {
        let local = self.fetch(path, opts.force)?;
        self.codec.decode(&local, opts.process.as_deref())
    }

    /// Encodes `batch` into the cache copy of `path` and uploads it.
    ///
    /// Fails with [`Error::FileExists`] when the object exists and
    /// `overwrite` is unset.
    pub fn write(&self, batch: &RecordBatch, path: &str, overwrite: bool) -> Result<StoreOutcome> {
        validate_path(path)?;
        let outcome = self.check_overwrite(path, overwrite)?;
        let local = self.local_path(path)?;
        self.codec.encode(batch, &local)?;
        self.storage.upload(&local, path)?;
        Ok(outcome)
    }

    /// Uploads an existing local file to `path`.
    pub fn put(&self, local: &Path, path: &str, overwrite: bool) -> Result<StoreOutcome> {
        validate_path(path)?;
        if !local.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a file", local.display()),
            )));
        }
        let outcome = self.check_overwrite(path, overwrite)?;
        self.storage.upload(local, path)?;
        Ok(outcome)
    }

    fn check_overwrite(&self, path: &str, overwrite: bool) -> Result<StoreOutcome> {
        if !self.storage.exists(path)? {
            return Ok(StoreOutcome::Created);
        }
        if !overwrite {
            return Err(Error::FileExists(path.to_string()));
        }
        info!("Overwriting existing object {path}");
        Ok(StoreOutcome::Replaced)
    }
}
