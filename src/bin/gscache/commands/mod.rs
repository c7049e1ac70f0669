pub mod config;
pub mod get;
pub mod ls;
pub mod put;
pub mod read;
pub mod read_many;
pub mod stale;
pub mod write;
