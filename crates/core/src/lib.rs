pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod storage;

pub use error::{ConfigError, DataError, Error, Result};
