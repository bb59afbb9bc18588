//! Context lookups supplied by the host EHR.

use async_trait::async_trait;
use rxgate_core::{
    AccountId, FacilityDescriptor, PatientId, PatientInfo, PharmacyRecord, ProviderInfo,
    TransmissionContext, TransmissionContextBuilder, Vitals,
};
use thiserror::Error;

/// Errors from a context lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The record the lookup requires does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The lookup itself failed.
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Read-only lookups for the data that goes into a transmission.
///
/// Absent vitals are [`Vitals::NOT_RECORDED`] and absent pharmacies are
/// `None`; neither is an error.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// The prescribing clinician behind an account.
    async fn provider_info(&self, account: &AccountId) -> Result<ProviderInfo, ContextError>;

    /// Display name for a patient.
    async fn patient_name(&self, patient: &PatientId) -> Result<String, ContextError>;

    /// The facility the clinician is working from.
    async fn facility(&self, account: &AccountId) -> Result<FacilityDescriptor, ContextError>;

    /// Most recent vitals for a patient.
    async fn vitals(&self, patient: &PatientId) -> Result<Vitals, ContextError>;

    /// The patient's primary pharmacy, if any.
    async fn primary_pharmacy(
        &self,
        patient: &PatientId,
    ) -> Result<Option<PharmacyRecord>, ContextError>;

    /// The patient's alternate pharmacy, if any.
    async fn alternate_pharmacy(
        &self,
        patient: &PatientId,
    ) -> Result<Option<PharmacyRecord>, ContextError>;
}

/// Run every lookup and assemble the context for one request.
pub async fn assemble_context<C: ContextSource + ?Sized>(
    source: &C,
    account: &AccountId,
    patient: &PatientId,
) -> Result<TransmissionContext, ContextError> {
    let provider = source.provider_info(account).await?;
    let patient_name = source.patient_name(patient).await?;
    let facility = source.facility(account).await?;
    let vitals = source.vitals(patient).await?;
    let primary = source.primary_pharmacy(patient).await?.unwrap_or_default();
    let alternate = source.alternate_pharmacy(patient).await?.unwrap_or_default();

    Ok(TransmissionContextBuilder::new(
        provider,
        PatientInfo {
            id: patient.clone(),
            display_name: patient_name,
        },
    )
    .facility(facility)
    .vitals(vitals)
    .primary_pharmacy(primary)
    .alternate_pharmacy(alternate)
    .build())
}
