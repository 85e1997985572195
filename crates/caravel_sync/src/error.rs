//! Error types for replication coordination.

use crate::status::ActivityLevel;
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during replication coordination.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested collection does not exist in the store.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the missing collection.
        name: String,
    },

    /// Session or transport failure.
    #[error("session error: {message}")]
    Session {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// `await_state` did not reach its target in time.
    #[error("timed out after {waited:?} waiting for {target}")]
    Timeout {
        /// The activity level that was awaited.
        target: ActivityLevel,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The session has been closed.
    #[error("session already closed")]
    AlreadyClosed,
}

impl SyncError {
    /// Creates a retryable session error.
    pub fn session_retryable(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable session error.
    pub fn session_fatal(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Session { retryable, .. } => *retryable,
            SyncError::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::session_retryable("connection lost").is_retryable());
        assert!(!SyncError::session_fatal("bad certificate").is_retryable());
        assert!(SyncError::Timeout {
            target: ActivityLevel::Idle,
            waited: Duration::from_secs(5),
        }
        .is_retryable());
        assert!(!SyncError::Configuration("bad endpoint".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::CollectionNotFound {
            name: "shipments".into(),
        };
        assert_eq!(err.to_string(), "collection not found: shipments");

        let err = SyncError::Timeout {
            target: ActivityLevel::Stopped,
            waited: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("STOPPED"));
    }
}
