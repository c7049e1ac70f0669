//! # Configuration
//!
//! Locates the Google Cloud CLI and the local cache root. A [`Config`] holds
//! optional overrides; every `resolve_*` call re-reads the environment and the
//! filesystem, so nothing is cached between calls.
//!
//! Resolution order:
//! - CLI: override, `GSCACHE_CLI`, `gcloud` then `gsutil` on `PATH`, well-known
//!   install locations.
//! - Cache root: override, `GSCACHE_CACHE_DIR`, `<temp>/gscache`, then a
//!   hard-coded temp path.

use log::warn;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the CLI executable.
pub const CLI_ENV: &str = "GSCACHE_CLI";
/// Environment variable overriding the cache root.
pub const CACHE_ENV: &str = "GSCACHE_CACHE_DIR";

const CACHE_DIR_NAME: &str = "gscache";

#[cfg(windows)]
const FALLBACK_CACHE_ROOT: &str = r"C:\Temp\gscache";
#[cfg(not(windows))]
const FALLBACK_CACHE_ROOT: &str = "/tmp/gscache";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to `gcloud` (or `gsutil`).
    #[serde(default)]
    pub cli_path: Option<PathBuf>,
    /// Directory the remote hierarchy is mirrored under.
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
}

impl Config {
    /// Overrides taken from `GSCACHE_CLI` and `GSCACHE_CACHE_DIR`.
    pub fn from_env() -> Self {
        Config {
            cli_path: env_path(CLI_ENV),
            cache_root: env_path(CACHE_ENV),
        }
    }

    /// Reads a TOML file with optional `cli_path` and `cache_root` keys.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Sets the CLI override. A path that does not exist is kept, with a warning.
    pub fn set_cli_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !path.exists() {
            warn!("CLI path {} does not exist", path.display());
        }
        self.cli_path = Some(path);
    }

    pub fn set_cache_root(&mut self, path: impl Into<PathBuf>) {
        self.cache_root = Some(path.into());
    }

    /// Fills unset fields from `other`.
    pub fn or(self, other: Config) -> Config {
        Config {
            cli_path: self.cli_path.or(other.cli_path),
            cache_root: self.cache_root.or(other.cache_root),
        }
    }

    pub fn resolve_cli_path(&self) -> Result<PathBuf> {
        if let Some(p) = self.cli_path.clone().or_else(|| env_path(CLI_ENV)) {
            return Ok(p);
        }
        for name in ["gcloud", "gsutil"] {
            if let Ok(p) = which::which(name) {
                return Ok(p);
            }
        }
        if let Some(p) = known_cli_locations().into_iter().find(|p| p.is_file()) {
            return Ok(p);
        }
        Err(Error::CliNotFound(
            "not on PATH and not in any standard install location".to_string(),
        ))
    }

    /// Returns the cache root, creating it if needed.
    pub fn resolve_cache_root(&self) -> Result<PathBuf> {
        if let Some(p) = self.cache_root.clone().or_else(|| env_path(CACHE_ENV)) {
            fs::create_dir_all(&p)?;
            return Ok(p);
        }
        let default = env::temp_dir().join(CACHE_DIR_NAME);
        match fs::create_dir_all(&default) {
            Ok(()) => Ok(default),
            Err(e) => {
                warn!(
                    "Cannot create cache root {}: {e}; falling back to {FALLBACK_CACHE_ROOT}",
                    default.display()
                );
                let fallback = PathBuf::from(FALLBACK_CACHE_ROOT);
                fs::create_dir_all(&fallback)?;
                Ok(fallback)
            }
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn home() -> Option<PathBuf> {
    env_path("HOME").or_else(|| env_path("USERPROFILE"))
}

#[cfg(target_os = "macos")]
fn known_cli_locations() -> Vec<PathBuf> {
    let mut v: Vec<PathBuf> = [
        "/usr/local/bin/gcloud",
        "/opt/homebrew/bin/gcloud",
        "/opt/homebrew/share/google-cloud-sdk/bin/gcloud",
        "/usr/local/Caskroom/google-cloud-sdk/latest/google-cloud-sdk/bin/gcloud",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if let Some(h) = home() {
        v.push(h.join("google-cloud-sdk/bin/gcloud"));
    }
    v
}

#[cfg(windows)]
fn known_cli_locations() -> Vec<PathBuf> {
    let mut v: Vec<PathBuf> = [
        r"C:\Program Files (x86)\Google\Cloud SDK\google-cloud-sdk\bin\gcloud.cmd",
        r"C:\Program Files\Google\Cloud SDK\google-cloud-sdk\bin\gcloud.cmd",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if let Some(local) = env_path("LOCALAPPDATA") {
        v.push(local.join(r"Google\Cloud SDK\google-cloud-sdk\bin\gcloud.cmd"));
    }
    v
}

#[cfg(not(any(target_os = "macos", windows)))]
fn known_cli_locations() -> Vec<PathBuf> {
    let mut v: Vec<PathBuf> = [
        "/usr/bin/gcloud",
        "/usr/local/bin/gcloud",
        "/snap/bin/gcloud",
        "/usr/lib/google-cloud-sdk/bin/gcloud",
        "/opt/google-cloud-sdk/bin/gcloud",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if let Some(h) = home() {
        v.push(h.join("google-cloud-sdk/bin/gcloud"));
    }
    v
}
