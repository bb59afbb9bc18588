//! Strong type definitions for rxgate.
//!
//! Identifiers are newtypes so an account id can never be passed where a
//! patient id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A clinician account identifier.
///
/// Each account owns exactly one active encryption key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A patient identifier.
///
/// Always passed explicitly into the workflow, never read from session state.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(String);

impl PatientId {
    /// Create a new patient id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatientId({})", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_display() {
        let id = AccountId::new("dr-house");
        assert_eq!(id.to_string(), "dr-house");
        assert_eq!(format!("{:?}", id), "AccountId(dr-house)");
    }

    #[test]
    fn test_patient_id_from_str() {
        let id: PatientId = "42".into();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_serde_transparent_shape() {
        let id = AccountId::new("acct-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acct-1\"");
    }
}
