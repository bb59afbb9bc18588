//! Error types for the key store.

use thiserror::Error;

/// Errors that can occur during key store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The backing infrastructure could not be reached.
    #[error("key infrastructure unavailable: {0}")]
    Unavailable(String),

    /// A newer key was already activated for this account.
    #[error("stale key for {account}: generation {attempted} is not above active generation {active}")]
    StaleGeneration {
        account: String,
        attempted: u64,
        active: u64,
    },

    /// Invalid data in storage or in a request.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Check if this error means the infrastructure could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
