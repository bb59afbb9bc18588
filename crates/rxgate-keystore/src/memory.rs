//! In-memory implementation of the KeyStore trait.
//!
//! Same semantics as SQLite but keeps everything in memory with no
//! persistence. Useful for tests and for embedding behind an external
//! key-management service.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rxgate_core::AccountId;

use crate::error::{Result, StoreError};
use crate::traits::{now_millis, KeyEvent, KeyEventKind, KeyStore, StoredKey};

/// In-memory key store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// `set` swaps the whole record under the write lock.
pub struct MemoryKeyStore {
    inner: RwLock<MemoryKeyStoreInner>,
}

#[derive(Default)]
struct MemoryKeyStoreInner {
    /// Active key per account.
    active: HashMap<AccountId, StoredKey>,

    /// Highest generation ever issued per account.
    issued: HashMap<AccountId, u64>,

    /// Lifecycle events per account.
    events: HashMap<AccountId, Vec<KeyEvent>>,
}

impl MemoryKeyStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryKeyStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryKeyStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryKeyStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, account: &AccountId) -> Result<Option<StoredKey>> {
        let inner = self.read()?;
        Ok(inner.active.get(account).cloned())
    }

    async fn invalidate_and_issue(&self, account: &AccountId) -> Result<StoredKey> {
        let mut inner = self.write()?;

        let active_gen = inner.active.get(account).map(|k| k.generation).unwrap_or(0);
        let issued_gen = inner.issued.get(account).copied().unwrap_or(0);
        let generation = active_gen.max(issued_gen) + 1;

        let now = now_millis();
        let key = StoredKey::issue(account.clone(), generation, now);

        inner.issued.insert(account.clone(), generation);
        inner.events.entry(account.clone()).or_default().push(KeyEvent {
            account: account.clone(),
            generation,
            kind: KeyEventKind::Issued,
            at: now,
        });

        Ok(key)
    }

    async fn set(&self, account: &AccountId, key: StoredKey) -> Result<()> {
        if &key.account != account {
            return Err(StoreError::InvalidData(format!(
                "key for {} cannot be set on {}",
                key.account, account
            )));
        }

        let mut inner = self.write()?;

        if let Some(active) = inner.active.get(account) {
            if key.generation <= active.generation {
                return Err(StoreError::StaleGeneration {
                    account: account.to_string(),
                    attempted: key.generation,
                    active: active.generation,
                });
            }
        }

        let generation = key.generation;
        let issued = inner.issued.entry(account.clone()).or_insert(0);
        *issued = (*issued).max(generation);

        inner.active.insert(account.clone(), key);
        inner.events.entry(account.clone()).or_default().push(KeyEvent {
            account: account.clone(),
            generation,
            kind: KeyEventKind::Activated,
            at: now_millis(),
        });

        Ok(())
    }

    async fn key_history(&self, account: &AccountId) -> Result<Vec<KeyEvent>> {
        let inner = self.read()?;
        Ok(inner.events.get(account).cloned().unwrap_or_default())
    }
}
