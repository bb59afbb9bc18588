//! Error types for rxgate.

use rxgate_core::{InvalidReason, ValidationStatus};
use rxgate_keystore::StoreError;
use thiserror::Error;

use crate::source::ContextError;

/// Errors that abort a request outside the transmission state machine.
#[derive(Debug, Error)]
pub enum GateError {
    /// Key store error other than unavailability.
    #[error("key store error: {0}")]
    Store(#[from] StoreError),

    /// A context lookup failed.
    #[error("context lookup error: {0}")]
    Context(#[from] ContextError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a request did not end in a compose target.
///
/// Key failures are user-recoverable through reset. Infrastructure failures
/// are not user-actionable. Cipher failures are fatal for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitFailure {
    #[error("no encryption key on file")]
    KeyMissing,

    #[error("encryption key is invalid")]
    KeyInvalid,

    #[error("key infrastructure unavailable")]
    InfrastructureUnavailable,

    #[error("cipher failure: {0}")]
    CipherFailure(String),
}

impl TransmitFailure {
    /// Classify a non-valid validation status.
    pub fn from_status(status: ValidationStatus) -> Option<Self> {
        match status {
            ValidationStatus::Invalid(InvalidReason::KeyMissing) => Some(Self::KeyMissing),
            ValidationStatus::Invalid(_) => Some(Self::KeyInvalid),
            ValidationStatus::NetworkUnavailable => Some(Self::InfrastructureUnavailable),
            ValidationStatus::Valid | ValidationStatus::Unknown => None,
        }
    }

    /// Check if the user can recover by resetting their key.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::KeyMissing | Self::KeyInvalid)
    }
}

/// Result type for rxgate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            TransmitFailure::from_status(ValidationStatus::Invalid(InvalidReason::KeyMissing)),
            Some(TransmitFailure::KeyMissing)
        );
        assert_eq!(
            TransmitFailure::from_status(ValidationStatus::Invalid(
                InvalidReason::RoundTripMismatch
            )),
            Some(TransmitFailure::KeyInvalid)
        );
        assert_eq!(
            TransmitFailure::from_status(ValidationStatus::NetworkUnavailable),
            Some(TransmitFailure::InfrastructureUnavailable)
        );
        assert_eq!(TransmitFailure::from_status(ValidationStatus::Valid), None);
    }

    #[test]
    fn test_only_key_failures_are_user_recoverable() {
        assert!(TransmitFailure::KeyMissing.is_user_recoverable());
        assert!(TransmitFailure::KeyInvalid.is_user_recoverable());
        assert!(!TransmitFailure::InfrastructureUnavailable.is_user_recoverable());
        assert!(!TransmitFailure::CipherFailure("x".into()).is_user_recoverable());
    }
}
