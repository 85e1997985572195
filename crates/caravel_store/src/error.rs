//! Error types for the document store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store runtime has not been initialized.
    #[error("store runtime not initialized: call runtime::initialize() first")]
    NotInitialized,

    /// The store has been closed.
    #[error("store `{name}` is closed")]
    Closed {
        /// Name of the closed store.
        name: String,
    },

    /// A requested scope does not exist.
    #[error("scope not found: {name}")]
    ScopeNotFound {
        /// Name of the missing scope.
        name: String,
    },

    /// A requested collection does not exist.
    #[error("collection not found: {scope}.{name}")]
    CollectionNotFound {
        /// Scope that was searched.
        scope: String,
        /// Name of the missing collection.
        name: String,
    },

    /// A document payload was rejected.
    #[error("invalid document `{id}`: {reason}")]
    InvalidDocument {
        /// Id of the rejected document.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// I/O error while managing the store directory.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
