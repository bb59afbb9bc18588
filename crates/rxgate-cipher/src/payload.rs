//! Transmission payload construction.
//!
//! The payload handed to the prescribing network is the canonical encoding
//! of a [`TransmissionContext`], sealed with the account's verified key and
//! base64url-encoded so it can ride in a query parameter.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rxgate_core::{canonical_context_bytes, decode_context, TransmissionContext};

use crate::crypto::EncryptionKey;
use crate::envelope::SealedEnvelope;
use crate::error::{CipherError, Result};
use crate::validator::VerifiedKey;

/// An encrypted, URL-safe transmission token.
///
/// Single-use from the receiving network's point of view; derive a fresh
/// one for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherPayload(String);

impl CipherPayload {
    /// Wrap an encoded payload received from elsewhere, e.g. a query string.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Builds transmission payloads.
///
/// Requiring a [`VerifiedKey`] means a payload can never be built from a key
/// that has not just passed validation.
pub trait Cipher: Send + Sync {
    /// Seal the context under the verified key.
    ///
    /// Any failure is reported as [`CipherError::CipherFailure`].
    fn build_payload(
        &self,
        key: &VerifiedKey,
        context: &TransmissionContext,
    ) -> Result<CipherPayload>;
}

/// ChaCha20-Poly1305 payload cipher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCipher;

impl PayloadCipher {
    pub fn new() -> Self {
        Self
    }

    /// Open a payload and return the canonical context bytes.
    pub fn open(key: &EncryptionKey, payload: &CipherPayload) -> Result<Vec<u8>> {
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.as_str())
            .map_err(|e| CipherError::SerializationError(e.to_string()))?;
        SealedEnvelope::from_bytes(&bytes)?.open(key)
    }

    /// Open a payload and decode the context it carries.
    pub fn open_context(key: &EncryptionKey, payload: &CipherPayload) -> Result<TransmissionContext> {
        let canonical = Self::open(key, payload)?;
        Ok(decode_context(&canonical)?)
    }
}

impl Cipher for PayloadCipher {
    fn build_payload(
        &self,
        key: &VerifiedKey,
        context: &TransmissionContext,
    ) -> Result<CipherPayload> {
        let canonical = canonical_context_bytes(context)
            .map_err(|e| CipherError::CipherFailure(format!("serialization failed: {}", e)))?;

        let envelope = SealedEnvelope::seal(&canonical, key.key())
            .map_err(|e| CipherError::CipherFailure(format!("encryption failed: {}", e)))?;

        let bytes = envelope
            .to_bytes()
            .map_err(|e| CipherError::CipherFailure(format!("encoding failed: {}", e)))?;

        tracing::debug!(
            account = %key.account(),
            fingerprint = %key.fingerprint(),
            len = bytes.len(),
            "transmission payload sealed"
        );

        Ok(CipherPayload(URL_SAFE_NO_PAD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{KeyValidator, Verification};
    use rxgate_core::{
        AccountId, PatientId, PatientInfo, PharmacyRecord, ProviderInfo,
        TransmissionContextBuilder, Vitals,
    };
    use rxgate_keystore::{KeyStore, MemoryKeyStore};
    use std::sync::Arc;

    async fn verified_key() -> VerifiedKey {
        let account = AccountId::new("dr-ada");
        let store = Arc::new(MemoryKeyStore::new());
        let key = store.invalidate_and_issue(&account).await.unwrap();
        store.set(&account, key).await.unwrap();

        match KeyValidator::new(store).verify_key(&account).await {
            Verification::Verified(key) => key,
            other => panic!("expected verified key, got {:?}", other),
        }
    }

    fn context(vitals: Vitals) -> TransmissionContext {
        TransmissionContextBuilder::new(
            ProviderInfo {
                email: "ada+rx@clinic.example".into(),
                display_name: "Dr. Ada Lovelace".into(),
            },
            PatientInfo {
                id: PatientId::new("1001"),
                display_name: "Grace Hopper".into(),
            },
        )
        .vitals(vitals)
        .primary_pharmacy(PharmacyRecord {
            business_name: "Corner Drug".into(),
            address_line_1: "2 Elm St".into(),
            city: "Springfield".into(),
            ncpdp_id: None,
        })
        .build()
    }

    #[tokio::test]
    async fn test_payload_is_url_safe() {
        let key = verified_key().await;
        let payload = PayloadCipher::new()
            .build_payload(&key, &context(Vitals::NOT_RECORDED))
            .unwrap();

        assert!(payload
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_payload_opens_to_same_context() {
        let key = verified_key().await;
        let ctx = context(Vitals {
            height: 62.5,
            weight: 140.25,
            observed_at: Some(1_736_870_400_000),
        });

        let payload = PayloadCipher::new().build_payload(&key, &ctx).unwrap();
        let opened = PayloadCipher::open_context(key.key(), &payload).unwrap();
        assert_eq!(opened, ctx);
    }

    #[tokio::test]
    async fn test_partial_vitals_reach_the_receiver() {
        let key = verified_key().await;
        let ctx = context(Vitals {
            height: 60.0,
            weight: 0.0,
            observed_at: Some(1_736_870_400_000),
        });

        let payload = PayloadCipher::new().build_payload(&key, &ctx).unwrap();
        let opened = PayloadCipher::open_context(key.key(), &payload).unwrap();
        assert_eq!(opened.vitals(), ctx.vitals());
    }

    #[tokio::test]
    async fn test_fresh_payload_each_call_same_plaintext() {
        let key = verified_key().await;
        let ctx = context(Vitals::NOT_RECORDED);
        let cipher = PayloadCipher::new();

        let p1 = cipher.build_payload(&key, &ctx).unwrap();
        let p2 = cipher.build_payload(&key, &ctx).unwrap();
        assert_ne!(p1, p2);

        let c1 = PayloadCipher::open(key.key(), &p1).unwrap();
        let c2 = PayloadCipher::open(key.key(), &p2).unwrap();
        assert_eq!(c1, c2);
    }

    #[tokio::test]
    async fn test_unserializable_context_is_cipher_failure() {
        let key = verified_key().await;
        let ctx = context(Vitals {
            height: f64::INFINITY,
            weight: 120.0,
            observed_at: None,
        });

        let err = PayloadCipher::new().build_payload(&key, &ctx).unwrap_err();
        assert!(matches!(err, CipherError::CipherFailure(_)));
    }

    #[tokio::test]
    async fn test_open_with_other_key_fails() {
        let key = verified_key().await;
        let payload = PayloadCipher::new()
            .build_payload(&key, &context(Vitals::NOT_RECORDED))
            .unwrap();

        assert!(PayloadCipher::open(&EncryptionKey::generate(), &payload).is_err());
    }

    #[test]
    fn test_open_rejects_non_base64() {
        let payload = CipherPayload("not base64 !!".into());
        assert!(matches!(
            PayloadCipher::open(&EncryptionKey::generate(), &payload),
            Err(CipherError::SerializationError(_))
        ));
    }
}
