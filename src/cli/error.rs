//! CLI error types and conversions

use crate::cache::CacheError;
use crate::client::ClientError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Client error
    #[error("client error: {0}")]
    ClientError(#[from] ClientError),

    /// Cache error
    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),

    /// Output could not be written
    #[error("output error: {0}")]
    OutputError(String),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
