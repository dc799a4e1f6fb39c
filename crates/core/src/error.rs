//! Error type shared by the changetrack crates

use std::path::PathBuf;

/// Result type for changetrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers
///
/// Only programmer errors (bad arguments, disposed components, bad config)
/// are hard failures. Environmental failures degrade to empty results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("{0} has been disposed")]
    Disposed(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to build ignore rules: {0}")]
    Ignore(#[from] ::ignore::Error),
}
