//! Error types for the registry sync
//!
//! Fetch problems never surface here as fatal: the paged fetcher degrades them
//! to empty pages. What does surface is configuration trouble, sink failures
//! and local I/O.

use crate::sink::SinkError;
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Top-level error for a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    /// HTTP transport failure or non-2xx status from the registry API
    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Registry answered with a body that is not the expected JSON shape
    #[error("Failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check COSMO_* environment variables or the config file.")]
    Config(String),

    /// Sink rejected an operation (after retries where applicable)
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error(transparent)]
    Common(#[from] cosmo_common::CommonError),
}

impl SyncError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
