//! Sealed envelope.
//!
//! Encrypted bytes travel inside a small CBOR envelope carrying the format
//! tag and nonce needed to open them again.

use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::{CipherError, Result};

/// Format identifier for sealed envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnvelopeFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// An encrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Encryption algorithm used.
    pub format: EnvelopeFormat,

    /// Nonce used for encryption (unique per seal).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Encrypt plaintext with the given key under a fresh nonce.
    pub fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            format: EnvelopeFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the given key.
    pub fn open(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EnvelopeFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CipherError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CipherError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = EncryptionKey::generate();
        let envelope = SealedEnvelope::seal(b"canonical context", &key).unwrap();
        assert_eq!(envelope.open(&key).unwrap(), b"canonical context");
    }

    #[test]
    fn test_envelope_serialization() {
        let key = EncryptionKey::generate();
        let envelope = SealedEnvelope::seal(b"test", &key).unwrap();

        let bytes = envelope.to_bytes().unwrap();
        let recovered = SealedEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(envelope, recovered);
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = EncryptionKey::generate();
        let a = SealedEnvelope::seal(b"same", &key).unwrap();
        let b = SealedEnvelope::seal(b"same", &key).unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = SealedEnvelope::seal(b"secret", &EncryptionKey::generate()).unwrap();
        assert!(envelope.open(&EncryptionKey::generate()).is_err());
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        let key = EncryptionKey::generate();
        let bytes = SealedEnvelope::seal(b"secret", &key).unwrap().to_bytes().unwrap();
        assert!(matches!(
            SealedEnvelope::from_bytes(&bytes[..bytes.len() / 2]),
            Err(CipherError::SerializationError(_))
        ));
    }

    proptest::proptest! {
        #[test]
        fn any_flipped_ciphertext_bit_is_rejected(
            plaintext in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256),
            index in proptest::prelude::any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = EncryptionKey::generate();
            let mut envelope = SealedEnvelope::seal(&plaintext, &key).unwrap();
            let i = index.index(envelope.ciphertext.len());
            envelope.ciphertext[i] ^= 1 << bit;

            proptest::prop_assert!(envelope.open(&key).is_err());
        }
    }
}
