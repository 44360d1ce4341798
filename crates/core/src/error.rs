use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by a housewatch run.
///
/// Everything except [`Error::Data`] is fatal for the run. Data errors are
/// produced per listing and only ever reported alongside the records that
/// did normalize.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport failure, timeout or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered, but not with the structure we expect.
    #[error("unexpected provider response: {0}")]
    Schema(String),

    #[error("invalid listing data: {0}")]
    Data(#[from] DataError),

    #[error("email delivery failed: {0}")]
    Delivery(String),

    #[error("failed to write {}: {detail}", path.display())]
    Output { path: PathBuf, detail: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A single listing that could not be coerced into a typed record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("listing #{index}: zip code {value} is not an integer")]
    InvalidZipCode { index: usize, value: String },

    #[error("listing #{index}: price is missing")]
    MissingPrice { index: usize },

    #[error("listing #{index}: price {value} is not a number")]
    InvalidPrice { index: usize, value: String },
}
