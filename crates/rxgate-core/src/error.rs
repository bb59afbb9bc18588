//! Error types for rxgate core.

use thiserror::Error;

/// Errors raised while encoding or decoding core structures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("unsupported canonical version: {0}")]
    UnsupportedVersion(u64),

    #[error("malformed context: {0}")]
    MalformedContext(String),

    #[error("unknown validation status code: {0}")]
    UnknownStatusCode(u16),
}
