//! Error types for the draft store.

use thiserror::Error;

/// Unified error type for draft store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Value is larger than the store accepts.
    #[error("Storage quota exceeded: {size} bytes (limit {limit})")]
    QuotaExceeded { size: usize, limit: usize },

    /// Key cannot be mapped onto the backend.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// IO error for file-backed storage.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
