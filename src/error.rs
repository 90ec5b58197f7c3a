//! Crate-wide error and result types.

use std::io;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SondaError>;

/// Error type for all inspection operations.
#[derive(Debug, Error)]
pub enum SondaError {
    /// Underlying I/O failure (missing file, short header read, bad seek).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Structural validation failure in an on-disk layout.
    #[error("corrupt index layout: {0}")]
    Corruption(String),
    /// Caller-supplied argument rejected before any file access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Layout variant the inspector recognizes but cannot analyze.
    #[error("unsupported layout: {0}")]
    Unsupported(&'static str),
}

impl SondaError {
    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        SondaError::Corruption(msg.into())
    }
}
