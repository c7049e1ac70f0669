//! In-memory [`Storage`] used by the workflow tests.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Operation, Result};
use crate::gcs::path::basename;
use crate::gcs::storage::Storage;

/// One recorded storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Vec<String>),
    ListLong(String),
    DownloadMany(Vec<String>, PathBuf),
    Download(String, PathBuf),
    Upload(PathBuf, String),
}

struct Object {
    data: Vec<u8>,
    updated: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Object>>,
    calls: Mutex<Vec<Call>>,
    broken_listing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object updated an hour ago.
    pub fn put(&self, path: &str, data: &[u8]) {
        self.put_at(path, data, Utc::now() - chrono::Duration::hours(1));
    }

    pub fn put_at(&self, path: &str, data: &[u8], updated: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            Object {
                data: data.to_vec(),
                updated,
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).map(|o| o.data.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn bulk_transfers(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DownloadMany(s, _) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn individual_transfers(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Download(s, _) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Makes every long listing fail, as a CLI error would.
    pub fn break_long_listing(&self, broken: bool) {
        self.broken_listing.store(broken, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn read(&self, path: &str, operation: Operation) -> Result<Vec<u8>> {
        self.get(path).ok_or_else(|| Error::ExternalProcess {
            operation,
            command: format!("cp {path}"),
            status: "exit code 1".to_string(),
            stderr: "No URLs matched".to_string(),
        })
    }
}

impl Storage for MemoryStorage {
    fn list(&self, patterns: &[String]) -> Result<Vec<String>> {
        self.record(Call::List(patterns.to_vec()));
        let objects = self.objects.lock().unwrap();
        let mut out = Vec::new();
        for pattern in patterns {
            let alternatives = expand_braces(pattern);
            out.extend(
                objects
                    .keys()
                    .filter(|k| alternatives.iter().any(|p| wildcard_match(p, k)))
                    .cloned(),
            );
        }
        Ok(out)
    }

    fn list_long(&self, path: &str) -> Result<Vec<String>> {
        self.record(Call::ListLong(path.to_string()));
        if self.broken_listing.load(Ordering::SeqCst) {
            return Err(Error::ExternalProcess {
                operation: Operation::List,
                command: format!("ls -l {path}"),
                status: "exit code 1".to_string(),
                stderr: "ServiceUnavailable".to_string(),
            });
        }
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .get(path)
            .map(|o| {
                format!(
                    "{:>10}  {}  {}",
                    o.data.len(),
                    o.updated.format("%Y-%m-%dT%H:%M:%SZ"),
                    path
                )
            })
            .into_iter()
            .collect())
    }

    fn download_many(&self, sources: &[String], dest_dir: &Path) -> Result<()> {
        self.record(Call::DownloadMany(sources.to_vec(), dest_dir.to_path_buf()));
        fs::create_dir_all(dest_dir)?;
        for s in sources {
            let data = self.read(s, Operation::Batch)?;
            fs::write(dest_dir.join(basename(s)), data)?;
        }
        Ok(())
    }

    fn download(&self, source: &str, dest: &Path) -> Result<()> {
        self.record(Call::Download(source.to_string(), dest.to_path_buf()));
        let data = self.read(source, Operation::Download)?;
        fs::write(dest, data)?;
        Ok(())
    }

    fn upload(&self, source: &Path, dest: &str) -> Result<()> {
        self.record(Call::Upload(source.to_path_buf(), dest.to_string()));
        let data = fs::read(source)?;
        self.put_at(dest, &data, Utc::now());
        Ok(())
    }
}

/// Expands `{a,b}` groups (not nested) into every alternative.
fn expand_braces(pattern: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (pattern.find('{'), pattern.find('}')) else {
        return vec![pattern.to_string()];
    };
    if close < open {
        return vec![pattern.to_string()];
    }
    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{head}{alt}{tail}")))
        .collect()
}

/// `*` and `?` stay within one path segment, `**` crosses segments.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    fn go(p: &[u8], t: &[u8]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some(b'*') if p.get(1) == Some(&b'*') => (0..=t.len()).any(|i| go(&p[2..], &t[i..])),
            Some(b'*') => (0..=t.len())
                .take_while(|&i| i == 0 || t[i - 1] != b'/')
                .any(|i| go(&p[1..], &t[i..])),
            Some(b'?') => t.first().is_some_and(|&c| c != b'/') && go(&p[1..], &t[1..]),
            Some(&c) => t.first() == Some(&c) && go(&p[1..], &t[1..]),
        }
    }
    go(p, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards() {
        assert!(wildcard_match("gs://b/*.csv", "gs://b/a.csv"));
        assert!(!wildcard_match("gs://b/*.csv", "gs://b/d/a.csv"));
        assert!(wildcard_match("gs://b/**.csv", "gs://b/d/a.csv"));
        assert!(wildcard_match("gs://b/?.csv", "gs://b/a.csv"));
        assert!(wildcard_match("gs://b/a.csv", "gs://b/a.csv"));
    }

    #[test]
    fn braces() {
        assert_eq!(
            expand_braces("gs://b/{x,y}/*.csv"),
            vec!["gs://b/x/*.csv", "gs://b/y/*.csv"]
        );
    }
}
