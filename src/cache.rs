//! # Local Cache Store
//!
//! Remote objects are mirrored under the cache root at
//! `<cache_root>/<bucket>/<object path>`. A cached copy is stale when the
//! remote update timestamp is newer than the local file's change time.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gcs::path::{SCHEME, is_dot_segment};
use crate::gcs::storage::Storage;
use crate::gcs::types::FileInfo;

/// Whether a remote object must be transferred before it can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    NeedsFetch,
    Cached,
}

/// Maps a remote identifier to its local mirror path.
///
/// Empty, `.` and `..` segments are dropped, so the result always stays
/// under `cache_root`.
pub fn local_path(cache_root: &Path, remote: &str) -> PathBuf {
    let rel = remote.strip_prefix(SCHEME).unwrap_or(remote);
    let mut path = cache_root.to_path_buf();
    path.extend(rel.split('/').filter(|s| !s.is_empty() && !is_dot_segment(s)));
    path
}

/// Extracts the update timestamp from one `ls -l` line.
pub fn parse_listing_timestamp(line: &str) -> Result<DateTime<Utc>> {
    Ok(FileInfo::from_long_line(line)?.updated)
}

/// The time the local file last changed: inode change time on Unix,
/// modification time elsewhere.
pub fn local_change_time(path: &Path) -> Result<DateTime<Utc>> {
    let meta = fs::metadata(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Some(t) = DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32) {
            return Ok(t);
        }
    }
    Ok(DateTime::<Utc>::from(meta.modified()?))
}

/// True iff `remote` is strictly newer than `local`.
pub fn is_newer(remote: DateTime<Utc>, local: DateTime<Utc>) -> bool {
    remote > local
}

/// Compares the remote listing timestamp of `remote` with `local`.
///
/// `local` must exist. An empty listing means the object is gone and is
/// reported as [`Error::NotFound`], never as "fresh".
pub fn is_stale<S: Storage + ?Sized>(storage: &S, remote: &str, local: &Path) -> Result<bool> {
    let lines = storage.list_long(remote)?;
    let first = lines
        .first()
        .ok_or_else(|| Error::NotFound(remote.to_string()))?;
    let remote_time = parse_listing_timestamp(first)?;
    let local_time = local_change_time(local)?;
    Ok(is_newer(remote_time, local_time))
}

/// Decides whether `remote` needs a transfer into `local`.
///
/// A missing local file needs a fetch without consulting the remote.
pub fn cache_state<S: Storage + ?Sized>(storage: &S, remote: &str, local: &Path) -> Result<CacheState> {
    if !local.is_file() {
        return Ok(CacheState::NeedsFetch);
    }
    if is_stale(storage, remote, local)? {
        Ok(CacheState::NeedsFetch)
    } else {
        Ok(CacheState::Cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;
    use anyhow::Result;
    use chrono::{Duration, TimeZone};

    #[test]
    fn local_path_mirrors_remote() {
        let root = Path::new("/cache");
        assert_eq!(
            local_path(root, "gs://bucket/a/b/c.csv"),
            PathBuf::from("/cache/bucket/a/b/c.csv")
        );
    }

    #[test]
    fn local_path_stays_under_root() {
        let root = Path::new("/cache");
        let p = local_path(root, "gs://b/../../outside.csv");
        assert_eq!(p, PathBuf::from("/cache/b/outside.csv"));
        assert!(p.starts_with(root));
        assert_eq!(local_path(root, "gs://b/./x/.//y.csv"), PathBuf::from("/cache/b/x/y.csv"));
    }

    #[test]
    fn newer_is_strict() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(is_newer(t + Duration::minutes(1), t));
        assert!(!is_newer(t, t));
        assert!(!is_newer(t - Duration::minutes(1), t));
    }

    #[test]
    fn stale_when_remote_is_newer() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let local = dir.path().join("a.csv");
        fs::write(&local, "x\n1\n")?;
        let storage = MemoryStorage::new();

        storage.put_at("gs://b/a.csv", b"x\n1\n", Utc::now() + Duration::days(1));
        assert!(is_stale(&storage, "gs://b/a.csv", &local)?);

        storage.put_at("gs://b/a.csv", b"x\n1\n", Utc::now() - Duration::days(1));
        assert!(!is_stale(&storage, "gs://b/a.csv", &local)?);
        Ok(())
    }

    #[test]
    fn missing_remote_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let local = dir.path().join("a.csv");
        fs::write(&local, "x\n")?;
        let storage = MemoryStorage::new();
        let err = is_stale(&storage, "gs://b/a.csv", &local).unwrap_err();
        assert!(matches!(err, Error::NotFound(p) if p == "gs://b/a.csv"));
        Ok(())
    }

    #[test]
    fn absent_local_needs_fetch_without_listing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = MemoryStorage::new();
        let state = cache_state(&storage, "gs://b/a.csv", &dir.path().join("a.csv"))?;
        assert_eq!(state, CacheState::NeedsFetch);
        assert!(storage.calls().is_empty());
        Ok(())
    }

    #[test]
    fn parses_first_listing_line() -> Result<()> {
        let t = parse_listing_timestamp("  5  2023-12-31T23:59:59Z  gs://b/x.csv")?;
        assert_eq!(t, Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap());
        Ok(())
    }
}
