//! Cryptographic primitives.
//!
//! ChaCha20-Poly1305 authenticated encryption with 256-bit keys.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::{Deserialize, Serialize};

use crate::error::{CipherError, Result};

/// A 256-bit symmetric encryption key for ChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse stored key material.
    ///
    /// Rejects material of the wrong length and the all-zero key.
    pub fn from_material(material: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = material.try_into().map_err(|_| {
            CipherError::MalformedKey(format!("expected 32 bytes, got {}", material.len()))
        })?;
        if bytes.iter().all(|b| *b == 0) {
            return Err(CipherError::MalformedKey("all-zero key".into()));
        }
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short identifier safe to log.
    pub fn fingerprint(&self) -> KeyFingerprint {
        KeyFingerprint::of(&self.0)
    }

    fn aead(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Seal `plaintext`; the output carries a 16-byte tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.aead()
            .encrypt(Nonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|_| CipherError::EncryptionError("aead seal failed".into()))
    }

    /// Open `ciphertext`. Fails on any tampering or key mismatch.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.aead()
            .decrypt(Nonce::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| CipherError::DecryptionError("authentication failed".into()))
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// A fresh random nonce. Never reuse one under the same key.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A short, one-way identifier for key material.
///
/// Lets logs and audit trails tell keys apart without exposing them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint([u8; 8]);

impl KeyFingerprint {
    /// Fingerprint raw key material.
    pub fn of(material: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("rxgate-v1-key-fingerprint");
        hasher.update(material);
        let mut out = [0u8; 8];
        out.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        Self(out)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({})", self.to_hex())
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();
        let plaintext = b"hello, pharmacy!";

        let ciphertext = key.encrypt(plaintext, &nonce).unwrap();
        assert_ne!(ciphertext, plaintext);

        let decrypted = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce).unwrap();
        assert!(matches!(
            key2.decrypt(&ciphertext, &nonce),
            Err(CipherError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_from_material_rejects_bad_lengths() {
        assert!(EncryptionKey::from_material(&[7u8; 31]).is_err());
        assert!(EncryptionKey::from_material(&[7u8; 33]).is_err());
        assert!(EncryptionKey::from_material(&[]).is_err());
        assert!(EncryptionKey::from_material(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_from_material_rejects_zero_key() {
        assert!(matches!(
            EncryptionKey::from_material(&[0u8; 32]),
            Err(CipherError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_fingerprint_deterministic_and_distinct() {
        let a = EncryptionKey::from_bytes([0x42; 32]);
        let b = EncryptionKey::from_bytes([0x43; 32]);

        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().to_hex().len(), 16);
    }
}
