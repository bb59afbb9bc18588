//! # rxgate
//!
//! Key-gated encrypted handoff from an EHR to an e-prescribing network.
//!
//! ## Overview
//!
//! When a clinician opens the prescription composer for a patient, rxgate:
//!
//! 1. Optionally resets the clinician's encryption key on request
//! 2. Verifies the stored key with an encrypt-then-decrypt round trip
//! 3. Assembles the transmission context (prescriber, patient, facility,
//!    vitals, pharmacies) from a [`ContextSource`]
//! 4. Seals the context under the verified key and builds the compose URL
//!
//! Invalid keys end in a reset prompt. Unreachable key infrastructure ends
//! in a timed redirect back to the patient chart. Nothing is ever sent
//! under a key that was not verified in the same request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rxgate::{ComposeRequest, GateConfig, TransmissionOrchestrator};
//! use rxgate::keystore::SqliteKeyStore;
//!
//! let store = Arc::new(SqliteKeyStore::open("rxgate.db")?);
//! let gate = TransmissionOrchestrator::new(store, Arc::new(my_source), GateConfig::default())?;
//!
//! let report = gate
//!     .handle(&ComposeRequest::new(account, patient))
//!     .await?;
//!
//! if let Some(url) = report.outcome.compose_url() {
//!     // embed `url` in the compose frame
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Identifiers, transmission context, validation status, canonical encoding
//! - [`keystore`] - Per-account key storage (memory, SQLite)
//! - [`cipher`] - Key validation and payload encryption

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod source;
pub mod view;

pub use config::GateConfig;
pub use error::{GateError, Result, TransmitFailure};
pub use orchestrator::{
    BlockReason, ComposeRequest, GateState, TransmissionOrchestrator, TransmissionOutcome,
    TransmissionReport,
};
pub use source::{assemble_context, ContextError, ContextSource};
pub use view::{ComposeView, Notice, Redirect, ResetControl, VitalsDisplay};

// Re-export component crates
pub use rxgate_cipher as cipher;
pub use rxgate_core as core;
pub use rxgate_keystore as keystore;

// Re-export commonly used types
pub use rxgate_cipher::{Cipher, CipherPayload, KeyValidator, PayloadCipher, VerifiedKey};
pub use rxgate_core::{AccountId, PatientId, TransmissionContext, ValidationStatus};
pub use rxgate_keystore::{KeyStore, MemoryKeyStore, SqliteKeyStore, StoreError};
