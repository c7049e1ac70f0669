//! # Remote Path Handling
//!
//! Validation and small string helpers for `gs://` identifiers. Validation runs
//! before any external process is spawned, so a malformed path never reaches
//! the CLI.

use itertools::Itertools;
use log::{info, warn};

use crate::error::{Error, Result, ValidationRule};

/// The storage scheme every remote path starts with.
pub const SCHEME: &str = "gs://";

/// Characters that are rejected outright: redirects, pipes, command separators,
/// substitutions, escapes and line breaks.
pub const FORBIDDEN_CHARS: [char; 10] = ['<', '>', '|', '&', ';', '`', '$', '\\', '\n', '\r'];

/// Characters that are legal (the CLI expands globs and braces itself) but
/// need careful quoting when typed into a shell.
pub const QUOTE_CHARS: [char; 10] = ['*', '?', '[', ']', '{', '}', '(', ')', '\'', '"'];

/// Checks one or more remote paths.
///
/// With `allow_multiple` unset exactly one path must be supplied. Every path is
/// checked in order and the first violation is returned. Unquoted whitespace
/// produces a warning and glob/brace/quote characters an informational notice;
/// neither rejects the path.
pub fn validate_paths<S: AsRef<str>>(paths: &[S], allow_multiple: bool) -> Result<()> {
    let Some(first) = paths.first() else {
        return Err(Error::validation("", ValidationRule::Empty));
    };
    if !allow_multiple && paths.len() > 1 {
        return Err(Error::validation(first.as_ref(), ValidationRule::Multiple));
    }
    for path in paths {
        validate_one(path.as_ref())?;
    }
    Ok(())
}

/// Checks a single remote path.
pub fn validate_path(path: &str) -> Result<()> {
    validate_paths(&[path], false)
}

fn validate_one(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::validation(path, ValidationRule::Empty));
    }
    if !path.starts_with(SCHEME) {
        return Err(Error::validation(path, ValidationRule::MissingScheme));
    }
    if path == SCHEME {
        return Err(Error::validation(path, ValidationRule::BareScheme));
    }
    if let Some(c) = path.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(Error::validation(path, ValidationRule::ForbiddenChar(c)));
    }
    if path[SCHEME.len()..].split('/').any(is_dot_segment) {
        return Err(Error::validation(path, ValidationRule::DotSegment));
    }

    if path.chars().any(char::is_whitespace) && !is_quoted(path) {
        warn!("Remote path {path:?} contains whitespace; quote it when passing it through a shell");
    }
    let special = path
        .chars()
        .filter(|c| QUOTE_CHARS.contains(c))
        .unique()
        .join(" ");
    if !special.is_empty() {
        info!("Remote path {path:?} contains characters that need careful quoting: {special}");
    }
    Ok(())
}

/// `.` or `..`, the segments that resolve relative to their parent.
pub fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

fn is_quoted(path: &str) -> bool {
    path.len() >= 2
        && ((path.starts_with('"') && path.ends_with('"'))
            || (path.starts_with('\'') && path.ends_with('\'')))
}

/// Parses a GCS URL string (`gs://bucket/object/path`) into a bucket and object path.
pub fn parse_gs_url(s: &str) -> Result<(String, String)> {
    let rest = s
        .strip_prefix(SCHEME)
        .ok_or_else(|| Error::validation(s, ValidationRule::MissingScheme))?;
    let (bucket, object) = match rest.split_once('/') {
        Some((b, p)) => (b.to_string(), p.to_string()),
        None => (rest.to_string(), String::new()),
    };
    if bucket.is_empty() {
        return Err(Error::validation(s, ValidationRule::BareScheme));
    }
    Ok((bucket, object))
}

/// The last path segment of a remote identifier.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The remote "directory" holding `path`, without a trailing slash.
pub fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => path,
    }
}
