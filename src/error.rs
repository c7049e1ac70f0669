use std::fmt;

/// The validation rule a remote path violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// No path was supplied, or the path is an empty string.
    Empty,
    /// Several paths were supplied where exactly one is required.
    Multiple,
    /// The path does not start with `gs://`.
    MissingScheme,
    /// The path is the bare `gs://` prefix.
    BareScheme,
    /// The path contains a character that is never allowed.
    ForbiddenChar(char),
    /// A `.` or `..` segment, which would leave the cache root.
    DotSegment,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::Empty => write!(f, "path is empty"),
            ValidationRule::Multiple => write!(f, "exactly one path is required"),
            ValidationRule::MissingScheme => write!(f, "path must start with gs://"),
            ValidationRule::BareScheme => write!(f, "path must name something after gs://"),
            ValidationRule::ForbiddenChar(c) => {
                write!(f, "path contains forbidden character {:?}", c)
            }
            ValidationRule::DotSegment => write!(f, "path must not contain . or .. segments"),
        }
    }
}

/// The kind of external operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Download,
    Upload,
    Batch,
    Compress,
    Decode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::List => "listing",
            Operation::Download => "download",
            Operation::Upload => "upload",
            Operation::Batch => "batch download",
            Operation::Compress => "compression",
            Operation::Decode => "decode pipeline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid remote path {path:?}: {rule}")]
    Validation { path: String, rule: ValidationRule },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{operation} failed ({status}): {command}\n{stderr}")]
    ExternalProcess {
        operation: Operation,
        command: String,
        status: String,
        stderr: String,
    },

    /// A single file of a batch failed to decode or transform.
    #[error("failed on {path}: {source}")]
    PerFile {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// Tables stacked row-wise disagree on their columns.
    #[error("cannot stack tables: {0}")]
    SchemaMismatch(String),

    #[error("file exists: {0} (use overwrite to replace it)")]
    FileExists(String),

    #[error("cannot parse listing timestamp from {0:?}")]
    Timestamp(String),

    #[error(
        "gcloud CLI not found: {0}. Install the Google Cloud SDK \
         (https://cloud.google.com/sdk/docs/install) or set GSCACHE_CLI"
    )]
    CliNotFound(String),

    /// A caller-supplied transform failed.
    #[error(transparent)]
    Transform(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn validation(path: &str, rule: ValidationRule) -> Self {
        Error::Validation {
            path: path.to_string(),
            rule,
        }
    }

    /// The violated rule, if this is a validation error.
    pub fn validation_rule(&self) -> Option<ValidationRule> {
        match self {
            Error::Validation { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
