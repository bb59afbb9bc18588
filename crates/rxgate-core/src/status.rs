//! Key validation status.
//!
//! The outcome of checking whether an account's encryption key is usable.
//! Callers branch on the enum. The numeric [`ValidationStatus::code`] exists
//! only for audit logs and interop with systems that record a flat status
//! code, where every code above [`INFRASTRUCTURE_SENTINEL`] denotes an
//! environmental failure rather than a key defect.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Codes strictly above this value denote infrastructure failure.
/// Codes at or below it denote key or business-logic outcomes.
pub const INFRASTRUCTURE_SENTINEL: u16 = 997;

/// Why a key failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidReason {
    /// The account has no stored key.
    KeyMissing,
    /// The stored key material is not a usable key.
    KeyMalformed,
    /// The probe value did not survive an encrypt/decrypt round trip.
    RoundTripMismatch,
}

/// Current validation status of an account's key within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValidationStatus {
    /// Not yet checked.
    #[default]
    Unknown,
    /// The key round-trips the probe value.
    Valid,
    /// The key is absent or unusable. Recoverable by an explicit reset.
    Invalid(InvalidReason),
    /// Supporting infrastructure could not be reached. The key may be fine.
    NetworkUnavailable,
}

impl ValidationStatus {
    /// Numeric code for audit logs.
    pub fn code(self) -> u16 {
        match self {
            Self::Unknown => 0,
            Self::Valid => 1,
            Self::Invalid(InvalidReason::KeyMissing) => 10,
            Self::Invalid(InvalidReason::KeyMalformed) => 11,
            Self::Invalid(InvalidReason::RoundTripMismatch) => 12,
            Self::NetworkUnavailable => 998,
        }
    }

    /// Parse a numeric code. Any code above the sentinel is environmental.
    pub fn from_code(code: u16) -> Result<Self, CoreError> {
        if code > INFRASTRUCTURE_SENTINEL {
            return Ok(Self::NetworkUnavailable);
        }
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Valid),
            10 => Ok(Self::Invalid(InvalidReason::KeyMissing)),
            11 => Ok(Self::Invalid(InvalidReason::KeyMalformed)),
            12 => Ok(Self::Invalid(InvalidReason::RoundTripMismatch)),
            other => Err(CoreError::UnknownStatusCode(other)),
        }
    }

    /// Check if the key passed validation.
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Check if the failure is environmental (not a key defect).
    pub fn is_environmental(self) -> bool {
        matches!(self, Self::NetworkUnavailable)
    }

    /// Check if the failure is a key defect recoverable by reset.
    pub fn is_key_defect(self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Valid => f.write_str("valid"),
            Self::Invalid(InvalidReason::KeyMissing) => f.write_str("invalid (key missing)"),
            Self::Invalid(InvalidReason::KeyMalformed) => f.write_str("invalid (key malformed)"),
            Self::Invalid(InvalidReason::RoundTripMismatch) => {
                f.write_str("invalid (round trip mismatch)")
            }
            Self::NetworkUnavailable => f.write_str("network unavailable"),
        }
    }
}
