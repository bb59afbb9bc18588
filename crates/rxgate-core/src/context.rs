//! Transmission context: everything the compose target receives for one request.
//!
//! A context is assembled once per request from collaborator lookups and is
//! immutable afterwards. It is discarded once the page renders.

use serde::{Deserialize, Serialize};

use crate::types::PatientId;

/// The prescribing clinician.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Email the prescribing network knows the clinician by.
    pub email: String,
    /// Display name shown as "Prescriber".
    pub display_name: String,
}

/// The patient the prescription is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub id: PatientId,
    pub display_name: String,
}

/// Facility / location the clinician is currently working from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacilityDescriptor {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

/// A vitals snapshot.
///
/// A zero measurement was not recorded. Either one may be recorded alone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vitals {
    /// Height (inches).
    pub height: f64,
    /// Weight (pounds).
    pub weight: f64,
    /// When the vitals were observed (Unix milliseconds).
    pub observed_at: Option<i64>,
}

impl Vitals {
    /// Vitals with nothing recorded.
    pub const NOT_RECORDED: Self = Self {
        height: 0.0,
        weight: 0.0,
        observed_at: None,
    };

    /// Check if both height and weight were recorded.
    pub fn is_recorded(&self) -> bool {
        self.height > 0.0 && self.weight > 0.0
    }
}

/// A pharmacy record.
///
/// An absent pharmacy is represented by the empty record, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PharmacyRecord {
    pub business_name: String,
    pub address_line_1: String,
    pub city: String,
    /// NCPDP identifier, when the directory provides one.
    pub ncpdp_id: Option<String>,
}

impl PharmacyRecord {
    /// Check if this is the empty record.
    pub fn is_empty(&self) -> bool {
        self.business_name.is_empty()
            && self.address_line_1.is_empty()
            && self.city.is_empty()
            && self.ncpdp_id.is_none()
    }

    /// One-line summary: "name / address / city".
    pub fn summary(&self) -> String {
        format!(
            "{} / {} / {}",
            self.business_name, self.address_line_1, self.city
        )
    }
}

/// The full per-request context handed to the payload cipher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionContext {
    provider: ProviderInfo,
    patient: PatientInfo,
    facility: FacilityDescriptor,
    vitals: Vitals,
    primary_pharmacy: PharmacyRecord,
    alternate_pharmacy: PharmacyRecord,
}

impl TransmissionContext {
    pub fn provider(&self) -> &ProviderInfo {
        &self.provider
    }

    /// The provider email, sent both inside the payload and as `useremail`.
    pub fn provider_email(&self) -> &str {
        &self.provider.email
    }

    pub fn patient(&self) -> &PatientInfo {
        &self.patient
    }

    pub fn facility(&self) -> &FacilityDescriptor {
        &self.facility
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn primary_pharmacy(&self) -> &PharmacyRecord {
        &self.primary_pharmacy
    }

    pub fn alternate_pharmacy(&self) -> &PharmacyRecord {
        &self.alternate_pharmacy
    }
}

/// Builder for assembling a [`TransmissionContext`].
///
/// Facility, vitals and pharmacies default to empty / not recorded.
pub struct TransmissionContextBuilder {
    provider: ProviderInfo,
    patient: PatientInfo,
    facility: FacilityDescriptor,
    vitals: Vitals,
    primary_pharmacy: PharmacyRecord,
    alternate_pharmacy: PharmacyRecord,
}

impl TransmissionContextBuilder {
    /// Start building a context for a provider and patient.
    pub fn new(provider: ProviderInfo, patient: PatientInfo) -> Self {
        Self {
            provider,
            patient,
            facility: FacilityDescriptor::default(),
            vitals: Vitals::NOT_RECORDED,
            primary_pharmacy: PharmacyRecord::default(),
            alternate_pharmacy: PharmacyRecord::default(),
        }
    }

    /// Set the facility.
    pub fn facility(mut self, facility: FacilityDescriptor) -> Self {
        self.facility = facility;
        self
    }

    /// Set the vitals snapshot.
    pub fn vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    /// Set the primary pharmacy.
    pub fn primary_pharmacy(mut self, pharmacy: PharmacyRecord) -> Self {
        self.primary_pharmacy = pharmacy;
        self
    }

    /// Set the alternate pharmacy.
    pub fn alternate_pharmacy(mut self, pharmacy: PharmacyRecord) -> Self {
        self.alternate_pharmacy = pharmacy;
        self
    }

    /// Finish building.
    pub fn build(self) -> TransmissionContext {
        TransmissionContext {
            provider: self.provider,
            patient: self.patient,
            facility: self.facility,
            vitals: self.vitals,
            primary_pharmacy: self.primary_pharmacy,
            alternate_pharmacy: self.alternate_pharmacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderInfo {
        ProviderInfo {
            email: "prescriber@clinic.example".into(),
            display_name: "Dr. Ada Lovelace".into(),
        }
    }

    fn patient() -> PatientInfo {
        PatientInfo {
            id: PatientId::new("1001"),
            display_name: "Grace Hopper".into(),
        }
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = TransmissionContextBuilder::new(provider(), patient()).build();

        assert_eq!(ctx.provider_email(), "prescriber@clinic.example");
        assert!(!ctx.vitals().is_recorded());
        assert!(ctx.primary_pharmacy().is_empty());
        assert!(ctx.alternate_pharmacy().is_empty());
        assert_eq!(ctx.facility(), &FacilityDescriptor::default());
    }

    #[test]
    fn test_vitals_recorded_requires_both() {
        let height_only = Vitals {
            height: 60.0,
            weight: 0.0,
            observed_at: None,
        };
        assert!(!height_only.is_recorded());

        let both = Vitals {
            height: 60.0,
            weight: 120.5,
            observed_at: Some(1_700_000_000_000),
        };
        assert!(both.is_recorded());
    }

    #[test]
    fn test_pharmacy_summary() {
        let pharmacy = PharmacyRecord {
            business_name: "Corner Drug".into(),
            address_line_1: "1 Main St".into(),
            city: "Springfield".into(),
            ncpdp_id: None,
        };
        assert_eq!(pharmacy.summary(), "Corner Drug / 1 Main St / Springfield");
        assert!(!pharmacy.is_empty());
        assert_eq!(PharmacyRecord::default().summary(), " /  / ");
    }
}
