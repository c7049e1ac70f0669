pub mod cli;
pub mod path;
pub mod storage;
pub mod types;

pub use cli::{CliFlavor, GcloudCli};
pub use path::{validate_path, validate_paths};
pub use storage::Storage;
pub use types::FileInfo;
