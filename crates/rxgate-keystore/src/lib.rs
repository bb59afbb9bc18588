//! # rxgate Key Store
//!
//! Storage abstraction for per-account encryption keys. Provides a
//! trait-based interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Every clinician account has exactly one active key. Keys are never
//! edited: a reset issues a new key with a higher generation, which then
//! supersedes the old one when it is [`KeyStore::set`].
//!
//! ## Key Types
//!
//! - [`KeyStore`] - The async trait for all key operations
//! - [`SqliteKeyStore`] - SQLite-based persistent storage
//! - [`MemoryKeyStore`] - In-memory storage for tests and embedding
//! - [`StoredKey`] - A key record: raw material plus generation
//! - [`KeyEvent`] - Audit trail entry for issuance and activation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rxgate_core::AccountId;
//! use rxgate_keystore::{KeyStore, SqliteKeyStore};
//!
//! async fn example() {
//!     let store = SqliteKeyStore::open("keys.db").unwrap();
//!     let account = AccountId::new("dr-ada");
//!
//!     // Reset flow: issue, then activate
//!     let key = store.invalidate_and_issue(&account).await.unwrap();
//!     store.set(&account, key).await.unwrap();
//!
//!     let active = store.get(&account).await.unwrap();
//!     assert!(active.is_some());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic supersede**: `set` replaces the whole record at once; readers
//!   see either the old or the new key
//! - **Stale rejection**: `set` with a generation not above the active one fails
//! - **Unavailability**: an unreachable backend surfaces as [`StoreError::Unavailable`]

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryKeyStore;
pub use sqlite::SqliteKeyStore;
pub use traits::{KeyEvent, KeyEventKind, KeyStore, StoredKey, KEY_LEN};
