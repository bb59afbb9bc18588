//! Error types for the cipher module.

use thiserror::Error;

/// Errors that can occur during key validation and payload construction.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material is not a usable key.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Payload construction failed. Fatal for the request.
    #[error("cipher failure: {0}")]
    CipherFailure(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] rxgate_core::CoreError),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;
