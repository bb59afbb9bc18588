//! # rxgate Cipher
//!
//! Key validation and encrypted transmission payloads.
//!
//! ## Overview
//!
//! Before a prescription can be composed, the clinician's stored key must
//! prove it still works. [`KeyValidator`] encrypts and decrypts a fixed
//! probe value with the key; on success it hands back a [`VerifiedKey`].
//! [`PayloadCipher`] only accepts a `VerifiedKey`, so a payload can never be
//! built from a key that was not just validated.
//!
//! ## Payload Format
//!
//! 1. The [`TransmissionContext`](rxgate_core::TransmissionContext) is
//!    encoded to canonical CBOR
//! 2. The bytes are sealed with ChaCha20-Poly1305 under a fresh nonce
//! 3. The sealed envelope (format, nonce, ciphertext) is CBOR-encoded
//! 4. The envelope is base64url-encoded without padding
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rxgate_core::AccountId;
//! use rxgate_keystore::MemoryKeyStore;
//! use rxgate_cipher::{Cipher, KeyValidator, PayloadCipher, Verification};
//!
//! async fn example(context: rxgate_core::TransmissionContext) {
//!     let store = Arc::new(MemoryKeyStore::new());
//!     let validator = KeyValidator::new(store);
//!
//!     if let Verification::Verified(key) = validator.verify_key(&AccountId::new("dr-ada")).await {
//!         let payload = PayloadCipher::new().build_payload(&key, &context).unwrap();
//!         println!("{}", payload.as_str());
//!     }
//! }
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod validator;

pub use crypto::{EncryptionKey, EncryptionNonce, KeyFingerprint};
pub use envelope::{EnvelopeFormat, SealedEnvelope};
pub use error::{CipherError, Result};
pub use payload::{Cipher, CipherPayload, PayloadCipher};
pub use validator::{KeyValidator, Verification, VerifiedKey, PROBE_VALUE};
