//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use rxgate::{ComposeRequest, GateConfig, TransmissionOrchestrator};
use rxgate_cipher::Cipher;
use rxgate_core::{AccountId, PatientId};
use rxgate_keystore::{KeyStore, MemoryKeyStore, StoredKey};

use crate::doubles::StaticContextSource;

/// A clinician account, a patient, an in-memory key store and a context source.
pub struct TestFixture {
    pub account: AccountId,
    pub patient: PatientId,
    pub store: Arc<MemoryKeyStore>,
    pub source: Arc<StaticContextSource>,
}

impl TestFixture {
    /// Create a fixture whose account has no key yet.
    pub fn new() -> Self {
        Self::with_source(StaticContextSource::sample())
    }

    /// Create a fixture with a specific context source.
    pub fn with_source(source: StaticContextSource) -> Self {
        Self {
            account: AccountId::new("dr-ada"),
            patient: PatientId::new("1001"),
            store: Arc::new(MemoryKeyStore::new()),
            source: Arc::new(source),
        }
    }

    /// Issue and activate a key for the account. Returns its generation.
    pub async fn activate_key(&self) -> u64 {
        let key = self
            .store
            .invalidate_and_issue(&self.account)
            .await
            .expect("issue key");
        let generation = key.generation;
        self.store.set(&self.account, key).await.expect("activate key");
        generation
    }

    /// Activate key material that cannot be used as a key.
    pub async fn activate_malformed_key(&self) {
        let generation = self.active_generation().await.unwrap_or(0) + 1;
        self.store
            .set(
                &self.account,
                StoredKey {
                    account: self.account.clone(),
                    material: b"definitely-not-32-bytes".to_vec(),
                    generation,
                    issued_at: 0,
                },
            )
            .await
            .expect("activate malformed key");
    }

    /// The active key, if any.
    pub async fn active_key(&self) -> Option<StoredKey> {
        self.store.get(&self.account).await.expect("read key")
    }

    /// Generation of the active key, if any.
    pub async fn active_generation(&self) -> Option<u64> {
        self.active_key().await.map(|k| k.generation)
    }

    /// A plain compose request for the fixture's account and patient.
    pub fn request(&self) -> ComposeRequest {
        ComposeRequest::new(self.account.clone(), self.patient.clone())
    }

    /// An orchestrator over the fixture's store and source.
    pub fn orchestrator<X: Cipher>(
        &self,
        cipher: X,
        config: GateConfig,
    ) -> TransmissionOrchestrator<MemoryKeyStore, StaticContextSource, X> {
        TransmissionOrchestrator::with_cipher(
            Arc::clone(&self.store),
            Arc::clone(&self.source),
            cipher,
            config,
        )
        .expect("valid config")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
