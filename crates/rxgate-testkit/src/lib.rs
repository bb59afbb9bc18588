//! # rxgate Testkit
//!
//! Testing utilities for rxgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An account, a patient, a memory key store and a context source
//! - **Generators**: Proptest strategies for transmission contexts
//! - **Doubles**: An unreachable key store, a static context source, and
//!   ciphers that record or fail
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use rxgate::GateConfig;
//! use rxgate_testkit::{RecordingCipher, TestFixture};
//!
//! let fixture = TestFixture::new();
//! fixture.activate_key().await;
//!
//! let gate = fixture.orchestrator(RecordingCipher::new(), GateConfig::default());
//! let report = gate.handle(&fixture.request()).await?;
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use rxgate_testkit::generators;
//!
//! proptest! {
//!     #[test]
//!     fn canonical_is_deterministic(ctx in generators::context()) {
//!         let a = rxgate_core::canonical_context_bytes(&ctx).unwrap();
//!         let b = rxgate_core::canonical_context_bytes(&ctx).unwrap();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```

pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use doubles::{FailingCipher, RecordingCipher, StaticContextSource, UnreachableKeyStore};
pub use fixtures::TestFixture;
