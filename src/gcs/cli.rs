//! # gcloud / gsutil Adapter
//!
//! Implements [`Storage`] by spawning the Google Cloud CLI with an argument
//! vector. `gcloud` is driven through its `storage` command group; the legacy
//! `gsutil` binary takes the same verbs directly.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Operation, Result};
use crate::gcs::storage::Storage;
use crate::gcs::types::is_summary_line;
use crate::runner;

/// Which command line tool is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliFlavor {
    /// `gcloud storage <verb> ...`
    Gcloud,
    /// `gsutil <verb> ...`
    Gsutil,
}

impl CliFlavor {
    /// Guesses the flavour from the executable's file name.
    pub fn detect(program: &Path) -> CliFlavor {
        let stem = program
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if stem == "gsutil" {
            CliFlavor::Gsutil
        } else {
            CliFlavor::Gcloud
        }
    }
}

/// Storage backed by the installed Google Cloud CLI.
#[derive(Debug, Clone)]
pub struct GcloudCli {
    program: PathBuf,
    flavor: CliFlavor,
}

impl GcloudCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let flavor = CliFlavor::detect(&program);
        GcloudCli { program, flavor }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn flavor(&self) -> CliFlavor {
        self.flavor
    }

    /// Builds the argument vector for `verb`, prefixed for the flavour.
    fn args<I, S>(&self, verb: &str, rest: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args: Vec<OsString> = Vec::new();
        if self.flavor == CliFlavor::Gcloud {
            args.push("storage".into());
        }
        args.push(verb.into());
        args.extend(rest.into_iter().map(Into::into));
        args
    }

    /// Runs `ls`, treating "matched no objects" as an empty result.
    fn ls(&self, args: Vec<OsString>) -> Result<Vec<String>> {
        let out = runner::run(&self.program, &args)?;
        if !out.status.success() && matched_nothing(&out.stderr) {
            // Other patterns may still have matched.
            return Ok(out.lines());
        }
        Ok(out.check(Operation::List)?.lines())
    }
}

fn matched_nothing(stderr: &str) -> bool {
    stderr.contains("matched no objects") || stderr.contains("No URLs matched")
}

impl Storage for GcloudCli {
    fn list(&self, patterns: &[String]) -> Result<Vec<String>> {
        let lines = self.ls(self.args("ls", patterns.iter().cloned()))?;
        // Recursive-style output prefixes groups with "gs://dir/:" headers.
        Ok(lines
            .into_iter()
            .filter(|l| !l.ends_with(':') && !is_summary_line(l))
            .collect())
    }

    fn list_long(&self, path: &str) -> Result<Vec<String>> {
        let lines = self.ls(self.args("ls", ["-l", path]))?;
        Ok(lines.into_iter().filter(|l| !is_summary_line(l)).collect())
    }

    fn download_many(&self, sources: &[String], dest_dir: &Path) -> Result<()> {
        info!("Downloading {} objects into {}", sources.len(), dest_dir.display());
        let mut rest: Vec<OsString> = sources.iter().map(OsString::from).collect();
        rest.push(dir_target(dest_dir));
        runner::run_checked(Operation::Batch, &self.program, &self.args("cp", rest))?;
        Ok(())
    }

    fn download(&self, source: &str, dest: &Path) -> Result<()> {
        info!("Downloading {source} to {}", dest.display());
        let rest: Vec<OsString> = vec![source.into(), dest.as_os_str().to_owned()];
        runner::run_checked(Operation::Download, &self.program, &self.args("cp", rest))?;
        Ok(())
    }

    fn upload(&self, source: &Path, dest: &str) -> Result<()> {
        info!("Uploading {} to {dest}", source.display());
        let rest: Vec<OsString> = vec![source.as_os_str().to_owned(), dest.into()];
        runner::run_checked(Operation::Upload, &self.program, &self.args("cp", rest))?;
        Ok(())
    }
}

/// A directory destination with a trailing separator, so `cp` never treats
/// it as a file name.
fn dir_target(dir: &Path) -> OsString {
    let mut s = dir.as_os_str().to_owned();
    if !s.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) {
        s.push(std::path::MAIN_SEPARATOR_STR);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn detects_flavor() {
        assert_eq!(CliFlavor::detect(Path::new("/usr/bin/gcloud")), CliFlavor::Gcloud);
        assert_eq!(CliFlavor::detect(Path::new("/opt/sdk/bin/gsutil")), CliFlavor::Gsutil);
        assert_eq!(CliFlavor::detect(Path::new("gcloud.cmd")), CliFlavor::Gcloud);
    }

    #[test]
    fn builds_flavored_args() {
        let g = GcloudCli::new("gcloud");
        assert_eq!(g.args("ls", ["-l", "gs://b/x"]), vec!["storage", "ls", "-l", "gs://b/x"]);
        let u = GcloudCli::new("gsutil");
        assert_eq!(u.args("cp", ["a", "b"]), vec!["cp", "a", "b"]);
    }

    #[test]
    fn dir_target_has_trailing_separator() {
        let t = dir_target(Path::new("/tmp/cache/b/dir"));
        assert!(t.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR));
        let t2 = dir_target(&PathBuf::from(t.clone()));
        assert_eq!(t, t2);
    }

    #[cfg(unix)]
    fn fake_cli(dir: &Path, script: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("gcloud");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n"))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    #[test]
    #[cfg(unix)]
    fn ls_filters_headers_and_totals() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cli = GcloudCli::new(fake_cli(
            dir.path(),
            "echo 'gs://b/d/:'; echo 'gs://b/d/a.csv'; echo 'TOTAL: 1 objects, 3 bytes'",
        )?);
        assert_eq!(cli.list(&["gs://b/d/*".to_string()])?, vec!["gs://b/d/a.csv"]);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn ls_missing_object_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cli = GcloudCli::new(fake_cli(
            dir.path(),
            "echo 'ERROR: (gcloud.storage.ls) One or more URLs matched no objects.' 1>&2; exit 1",
        )?);
        assert!(cli.list_long("gs://b/missing.csv")?.is_empty());
        assert!(!cli.exists("gs://b/missing.csv")?);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn failed_copy_is_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cli = GcloudCli::new(fake_cli(dir.path(), "echo 'AccessDenied' 1>&2; exit 1")?);
        let err = cli.upload(Path::new("/tmp/x.csv"), "gs://b/x.csv").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ExternalProcess {
                operation: Operation::Upload,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    #[ignore]
    fn list_public_bucket_smoke() -> Result<()> {
        let cli = GcloudCli::new(crate::Config::default().resolve_cli_path()?);
        let _ = cli.list(&["gs://gcp-public-data-landsat/index.csv.gz".to_string()])?;
        Ok(())
    }
}
