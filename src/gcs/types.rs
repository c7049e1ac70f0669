use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Minute-precision layout of the timestamp in `ls -l` output.
pub const LISTING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// One parsed line of a long listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub size: Option<u64>,
    pub updated: DateTime<Utc>,
}

impl FileInfo {
    /// Parses `<size>  <timestamp>  <url>`; the url may contain spaces.
    pub fn from_long_line(line: &str) -> Result<FileInfo> {
        let bad = || Error::Timestamp(line.to_string());
        let (size, rest) = line.trim().split_once(char::is_whitespace).ok_or_else(bad)?;
        let rest = rest.trim_start();
        let (stamp, name) = match rest.split_once(char::is_whitespace) {
            Some((s, n)) => (s, n.trim()),
            None => (rest, ""),
        };
        Ok(FileInfo {
            name: name.to_string(),
            size: size.parse().ok(),
            updated: parse_timestamp(stamp).ok_or_else(bad)?,
        })
    }
}

/// Parses the first 16 characters of an ISO-8601 timestamp as a UTC minute.
pub fn parse_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let minute = stamp.get(..16)?;
    NaiveDateTime::parse_from_str(minute, LISTING_TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// `ls -l` ends with a `TOTAL: n objects, m bytes` summary.
pub fn is_summary_line(line: &str) -> bool {
    line.trim_start().starts_with("TOTAL:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_gcloud_long_line() {
        let info =
            FileInfo::from_long_line("      1234  2024-05-01T10:11:12Z  gs://b/dir/a file.csv")
                .unwrap();
        assert_eq!(info.size, Some(1234));
        assert_eq!(info.name, "gs://b/dir/a file.csv");
        assert_eq!(info.updated, Utc.with_ymd_and_hms(2024, 5, 1, 10, 11, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(FileInfo::from_long_line("TOTAL: 1 objects, 3 bytes").is_err());
        assert!(FileInfo::from_long_line("").is_err());
        assert!(parse_timestamp("2024-05").is_none());
    }

    #[test]
    fn summary_line() {
        assert!(is_summary_line("TOTAL: 2 objects, 10 bytes (10B)"));
        assert!(!is_summary_line("  12  2024-05-01T10:11:12Z  gs://b/x"));
    }
}
