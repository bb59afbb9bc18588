//! Key validation.
//!
//! Before any payload is built, the account's stored key must prove it can
//! encrypt and decrypt a well-known probe value. A successful check mints a
//! [`VerifiedKey`], which is the only way to reach the payload cipher.

use std::fmt;
use std::sync::Arc;

use rxgate_core::{AccountId, InvalidReason, ValidationStatus};
use rxgate_keystore::{KeyStore, StoreError};

use crate::crypto::{EncryptionKey, EncryptionNonce, KeyFingerprint};

/// Fixed plaintext used only to test that a key round-trips.
pub const PROBE_VALUE: &[u8] = b"rxgate-key-probe-v1";

/// A key that passed validation in the current request.
///
/// Cannot be constructed outside this crate. Holding one is proof that the
/// most recent check for this account returned `Valid`.
pub struct VerifiedKey {
    account: AccountId,
    key: EncryptionKey,
    generation: u64,
    fingerprint: KeyFingerprint,
}

impl VerifiedKey {
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fingerprint(&self) -> KeyFingerprint {
        self.fingerprint
    }
}

impl fmt::Debug for VerifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedKey")
            .field("account", &self.account)
            .field("generation", &self.generation)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Result of checking an account's key.
#[derive(Debug)]
pub enum Verification {
    /// The key round-trips the probe.
    Verified(VerifiedKey),
    /// The key is absent or unusable.
    Rejected(InvalidReason),
    /// The key store's infrastructure could not be reached.
    Unavailable(String),
}

impl Verification {
    /// The status this verification maps to.
    pub fn status(&self) -> ValidationStatus {
        match self {
            Verification::Verified(_) => ValidationStatus::Valid,
            Verification::Rejected(reason) => ValidationStatus::Invalid(*reason),
            Verification::Unavailable(_) => ValidationStatus::NetworkUnavailable,
        }
    }
}

/// Checks that an account's stored key is usable.
///
/// Pure check: never mutates the key.
pub struct KeyValidator<S: KeyStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyStore + ?Sized> KeyValidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check the account's key and classify the outcome.
    pub async fn verify(&self, account: &AccountId) -> ValidationStatus {
        self.verify_key(account).await.status()
    }

    /// Check the account's key, returning the verified key on success.
    pub async fn verify_key(&self, account: &AccountId) -> Verification {
        let stored = match self.store.get(account).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::warn!(account = %account, "no encryption key on file");
                return Verification::Rejected(InvalidReason::KeyMissing);
            }
            Err(StoreError::Unavailable(reason)) => {
                tracing::warn!(account = %account, %reason, "key infrastructure unreachable");
                return Verification::Unavailable(reason);
            }
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "stored key unreadable");
                return Verification::Rejected(InvalidReason::KeyMalformed);
            }
        };

        let key = match EncryptionKey::from_material(&stored.material) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(
                    account = %account,
                    generation = stored.generation,
                    error = %e,
                    "stored key malformed"
                );
                return Verification::Rejected(InvalidReason::KeyMalformed);
            }
        };

        if !probe_round_trips(&key) {
            tracing::warn!(
                account = %account,
                generation = stored.generation,
                fingerprint = %key.fingerprint(),
                "probe round trip failed"
            );
            return Verification::Rejected(InvalidReason::RoundTripMismatch);
        }

        let fingerprint = key.fingerprint();
        tracing::debug!(
            account = %account,
            generation = stored.generation,
            fingerprint = %fingerprint,
            "encryption key verified"
        );

        Verification::Verified(VerifiedKey {
            account: account.clone(),
            key,
            generation: stored.generation,
            fingerprint,
        })
    }
}

/// Encrypt the probe value and immediately decrypt it.
fn probe_round_trips(key: &EncryptionKey) -> bool {
    let nonce = EncryptionNonce::generate();
    key.encrypt(PROBE_VALUE, &nonce)
        .and_then(|ciphertext| key.decrypt(&ciphertext, &nonce))
        .map(|plaintext| plaintext == PROBE_VALUE)
        .unwrap_or(false)
}
