//! The storage seam: every side effect against the remote bucket goes through
//! [`Storage`], so workflows can run against the real CLI or an in-memory fake.

use std::path::Path;

use crate::error::Result;

/// Remote storage operations used by the fetch and store workflows.
pub trait Storage: Send + Sync {
    /// Lists the objects matching each pattern, in the order the backend
    /// reports them. Patterns may use glob and brace syntax. A pattern that
    /// matches nothing contributes no lines.
    fn list(&self, patterns: &[String]) -> Result<Vec<String>>;

    /// Long listing of exactly one identifier. Each line carries the size, the
    /// update timestamp and the object URL. Empty when the object is absent.
    fn list_long(&self, path: &str) -> Result<Vec<String>>;

    /// Bulk transfer: copies every source into `dest_dir`, keeping basenames.
    fn download_many(&self, sources: &[String], dest_dir: &Path) -> Result<()>;

    /// Individual transfer of one object to an exact local path.
    fn download(&self, source: &str, dest: &Path) -> Result<()>;

    /// Uploads a local file to `dest`, replacing any existing object.
    fn upload(&self, source: &Path, dest: &str) -> Result<()>;

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(!self.list_long(path)?.is_empty())
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn list(&self, patterns: &[String]) -> Result<Vec<String>> {
        (**self).list(patterns)
    }
    fn list_long(&self, path: &str) -> Result<Vec<String>> {
        (**self).list_long(path)
    }
    fn download_many(&self, sources: &[String], dest_dir: &Path) -> Result<()> {
        (**self).download_many(sources, dest_dir)
    }
    fn download(&self, source: &str, dest: &Path) -> Result<()> {
        (**self).download(source, dest)
    }
    fn upload(&self, source: &Path, dest: &str) -> Result<()> {
        (**self).upload(source, dest)
    }
    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }
}
