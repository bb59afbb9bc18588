//! # rxgate Core
//!
//! Pure primitives for rxgate: identifiers, the per-request transmission
//! context, key validation status, and canonical encoding.
//!
//! This crate contains no I/O, no storage, no cryptography. It describes
//! what gets sent to the prescribing network and how it is serialized.
//!
//! ## Key Types
//!
//! - [`AccountId`] / [`PatientId`] - Strongly typed identifiers
//! - [`TransmissionContext`] - Everything the compose target needs for one request
//! - [`ValidationStatus`] - Outcome of checking an account's encryption key
//!
//! ## Canonicalization
//!
//! Contexts are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod context;
pub mod error;
pub mod status;
pub mod types;

pub use canonical::{canonical_context_bytes, decode_context, CANONICAL_VERSION};
pub use context::{
    FacilityDescriptor, PatientInfo, PharmacyRecord, ProviderInfo, TransmissionContext,
    TransmissionContextBuilder, Vitals,
};
pub use error::CoreError;
pub use status::{InvalidReason, ValidationStatus, INFRASTRUCTURE_SENTINEL};
pub use types::{AccountId, PatientId};
