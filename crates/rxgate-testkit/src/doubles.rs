//! Test doubles for the orchestrator's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rxgate::{ContextError, ContextSource};
use rxgate_cipher::{Cipher, CipherError, CipherPayload, PayloadCipher, VerifiedKey};
use rxgate_core::{
    AccountId, FacilityDescriptor, PatientId, PharmacyRecord, ProviderInfo, TransmissionContext,
    Vitals,
};
use rxgate_keystore::{KeyEvent, KeyStore, StoreError, StoredKey};

/// A key store whose backing infrastructure is always unreachable.
#[derive(Debug, Default)]
pub struct UnreachableKeyStore;

impl UnreachableKeyStore {
    fn unavailable<T>() -> rxgate_keystore::Result<T> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[async_trait]
impl KeyStore for UnreachableKeyStore {
    async fn get(&self, _account: &AccountId) -> rxgate_keystore::Result<Option<StoredKey>> {
        Self::unavailable()
    }

    async fn invalidate_and_issue(
        &self,
        _account: &AccountId,
    ) -> rxgate_keystore::Result<StoredKey> {
        Self::unavailable()
    }

    async fn set(&self, _account: &AccountId, _key: StoredKey) -> rxgate_keystore::Result<()> {
        Self::unavailable()
    }

    async fn key_history(&self, _account: &AccountId) -> rxgate_keystore::Result<Vec<KeyEvent>> {
        Self::unavailable()
    }
}

/// A context source that answers every lookup from fixed values.
#[derive(Debug, Clone)]
pub struct StaticContextSource {
    pub provider: ProviderInfo,
    pub patient_name: String,
    pub facility: FacilityDescriptor,
    pub vitals: Vitals,
    pub primary_pharmacy: Option<PharmacyRecord>,
    pub alternate_pharmacy: Option<PharmacyRecord>,
    /// When set, the patient lookup fails with `NotFound`.
    pub patient_missing: bool,
}

impl StaticContextSource {
    /// A fully populated source.
    pub fn sample() -> Self {
        Self {
            provider: ProviderInfo {
                email: "ada+rx@clinic.example".into(),
                display_name: "Dr. Ada Lovelace".into(),
            },
            patient_name: "Grace Hopper".into(),
            facility: FacilityDescriptor {
                name: "Main Street Clinic".into(),
                street: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                postal_code: "62701".into(),
                phone: "555-0100".into(),
            },
            vitals: Vitals {
                height: 65.5,
                weight: 142.0,
                observed_at: Some(1_736_870_400_000),
            },
            primary_pharmacy: Some(PharmacyRecord {
                business_name: "Corner Drug".into(),
                address_line_1: "2 Elm St".into(),
                city: "Springfield".into(),
                ncpdp_id: Some("1234567".into()),
            }),
            alternate_pharmacy: None,
            patient_missing: false,
        }
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }
}

impl Default for StaticContextSource {
    fn default() -> Self {
        Self::sample()
    }
}

#[async_trait]
impl ContextSource for StaticContextSource {
    async fn provider_info(&self, _account: &AccountId) -> Result<ProviderInfo, ContextError> {
        Ok(self.provider.clone())
    }

    async fn patient_name(&self, patient: &PatientId) -> Result<String, ContextError> {
        if self.patient_missing {
            return Err(ContextError::NotFound(format!("patient {}", patient)));
        }
        Ok(self.patient_name.clone())
    }

    async fn facility(&self, _account: &AccountId) -> Result<FacilityDescriptor, ContextError> {
        Ok(self.facility.clone())
    }

    async fn vitals(&self, _patient: &PatientId) -> Result<Vitals, ContextError> {
        Ok(self.vitals)
    }

    async fn primary_pharmacy(
        &self,
        _patient: &PatientId,
    ) -> Result<Option<PharmacyRecord>, ContextError> {
        Ok(self.primary_pharmacy.clone())
    }

    async fn alternate_pharmacy(
        &self,
        _patient: &PatientId,
    ) -> Result<Option<PharmacyRecord>, ContextError> {
        Ok(self.alternate_pharmacy.clone())
    }
}

/// Wraps [`PayloadCipher`] and records every call.
#[derive(Debug, Default)]
pub struct RecordingCipher {
    inner: PayloadCipher,
    calls: AtomicUsize,
    generations: Mutex<Vec<u64>>,
}

impl RecordingCipher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Key generations used, in call order.
    pub fn generations(&self) -> Vec<u64> {
        self.generations
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl Cipher for RecordingCipher {
    fn build_payload(
        &self,
        key: &VerifiedKey,
        context: &TransmissionContext,
    ) -> rxgate_cipher::Result<CipherPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut generations) = self.generations.lock() {
            generations.push(key.generation());
        }
        self.inner.build_payload(key, context)
    }
}

/// A cipher that always fails.
#[derive(Debug, Default)]
pub struct FailingCipher;

impl Cipher for FailingCipher {
    fn build_payload(
        &self,
        _key: &VerifiedKey,
        _context: &TransmissionContext,
    ) -> rxgate_cipher::Result<CipherPayload> {
        Err(CipherError::CipherFailure("encryption failed: injected".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxgate_cipher::{KeyValidator, Verification};
    use rxgate_keystore::MemoryKeyStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unreachable_store_reports_unavailable() {
        let store = UnreachableKeyStore;
        let err = store.get(&AccountId::new("dr-ada")).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_recording_cipher_counts_calls() {
        let account = AccountId::new("dr-ada");
        let store = Arc::new(MemoryKeyStore::new());
        let key = store.invalidate_and_issue(&account).await.unwrap();
        store.set(&account, key).await.unwrap();

        let key = match KeyValidator::new(store).verify_key(&account).await {
            Verification::Verified(key) => key,
            other => panic!("expected verified key, got {:?}", other),
        };
        let source = StaticContextSource::sample();
        let context =
            rxgate::assemble_context(&source, &account, &PatientId::new("1001")).await.unwrap();

        let cipher = RecordingCipher::new();
        cipher.build_payload(&key, &context).unwrap();
        cipher.build_payload(&key, &context).unwrap();

        assert_eq!(cipher.calls(), 2);
        assert_eq!(cipher.generations(), vec![1, 1]);
    }
}
