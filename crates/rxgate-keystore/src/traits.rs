//! KeyStore trait: the abstract interface for per-account key persistence.
//!
//! The key store is an external key-management collaborator. This trait
//! lets the validator and orchestrator stay storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::fmt;

use async_trait::async_trait;
use rand::RngCore;
use rxgate_core::AccountId;

use crate::error::Result;

/// Length of issued key material in bytes (256-bit keys).
pub const KEY_LEN: usize = 32;

/// A key record as persisted for one account.
///
/// `material` is opaque: a store may hold bytes that are not a usable key,
/// and it is the validator's job to notice.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredKey {
    /// The owning account.
    pub account: AccountId,
    /// Raw key material.
    pub material: Vec<u8>,
    /// Monotonic generation; each reset issues a higher one.
    pub generation: u64,
    /// When the key was issued (Unix ms).
    pub issued_at: i64,
}

impl StoredKey {
    /// Issue fresh random key material for an account at a generation.
    pub fn issue(account: AccountId, generation: u64, issued_at: i64) -> Self {
        let mut material = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut material);
        Self {
            account,
            material,
            generation,
            issued_at,
        }
    }
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("account", &self.account)
            .field("material", &format_args!("<{} bytes redacted>", self.material.len()))
            .field("generation", &self.generation)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    /// A new key was issued by a reset (not yet active).
    Issued,
    /// A key became the account's active key.
    Activated,
}

impl KeyEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyEventKind::Issued => "issued",
            KeyEventKind::Activated => "activated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(KeyEventKind::Issued),
            "activated" => Some(KeyEventKind::Activated),
            _ => None,
        }
    }
}

/// Audit trail entry for an account's key lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub account: AccountId,
    pub generation: u64,
    pub kind: KeyEventKind,
    /// When the event was recorded (Unix ms).
    pub at: i64,
}

/// The KeyStore trait: async interface for per-account keys.
///
/// # Design Notes
///
/// - **One active key per account**: `get` returns the active key or `None`.
/// - **Issue does not activate**: `invalidate_and_issue` returns a new key
///   without persisting it as active; `set` does that.
/// - **Linearizable set**: a concurrent `get` observes either the previous
///   key or the new one in full.
/// - **Stale rejection**: `set` fails with `StaleGeneration` if the active
///   key's generation is already at or above the new key's.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Get the account's active key.
    async fn get(&self, account: &AccountId) -> Result<Option<StoredKey>>;

    /// Invalidate the account's current key with the backing infrastructure
    /// and obtain a newly issued one. Does not activate it.
    async fn invalidate_and_issue(&self, account: &AccountId) -> Result<StoredKey>;

    /// Persist `key` as the account's active key, superseding any prior key.
    async fn set(&self, account: &AccountId, key: StoredKey) -> Result<()>;

    /// The account's key lifecycle events, oldest first.
    async fn key_history(&self, account: &AccountId) -> Result<Vec<KeyEvent>>;
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_produces_fresh_material() {
        let account = AccountId::new("acct");
        let a = StoredKey::issue(account.clone(), 1, 0);
        let b = StoredKey::issue(account, 2, 0);

        assert_eq!(a.material.len(), KEY_LEN);
        assert_ne!(a.material, b.material);
    }

    #[test]
    fn test_debug_redacts_material() {
        let key = StoredKey {
            account: AccountId::new("acct"),
            material: vec![0xab; KEY_LEN],
            generation: 3,
            issued_at: 0,
        };
        let debug = format!("{:?}", key);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("171"));
    }

    #[test]
    fn test_event_kind_parse() {
        for kind in [KeyEventKind::Issued, KeyEventKind::Activated] {
            assert_eq!(KeyEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(KeyEventKind::parse("revoked"), None);
    }
}
