//! Error types for the console client.

use caravel_store::StoreError;
use caravel_sync::SyncError;
use std::io;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the console client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The properties file could not be parsed.
    #[error("properties error: {0}")]
    Properties(#[from] toml::de::Error),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Replication failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
