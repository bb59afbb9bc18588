//! Proptest generators for property-based testing.

use proptest::prelude::*;

use rxgate_core::{
    FacilityDescriptor, PatientId, PatientInfo, PharmacyRecord, ProviderInfo, TransmissionContext,
    TransmissionContextBuilder, Vitals,
};

/// Generate a short display string.
pub fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,'-]{0,24}"
}

/// Generate a provider with a plausible email.
pub fn provider() -> impl Strategy<Value = ProviderInfo> {
    ("[a-z]{1,12}(\\+rx)?", "[a-z]{1,10}", text()).prop_map(|(user, domain, display_name)| {
        ProviderInfo {
            email: format!("{}@{}.example", user, domain),
            display_name,
        }
    })
}

/// Generate a patient.
pub fn patient() -> impl Strategy<Value = PatientInfo> {
    (1u32..1_000_000, text()).prop_map(|(id, display_name)| PatientInfo {
        id: PatientId::new(id.to_string()),
        display_name,
    })
}

/// Generate a facility.
pub fn facility() -> impl Strategy<Value = FacilityDescriptor> {
    (text(), text(), text(), "[A-Z]{2}", "[0-9]{5}", "[0-9-]{0,12}").prop_map(
        |(name, street, city, state, postal_code, phone)| FacilityDescriptor {
            name,
            street,
            city,
            state,
            postal_code,
            phone,
        },
    )
}

/// Generate vitals, including the not-recorded case.
pub fn vitals() -> impl Strategy<Value = Vitals> {
    prop_oneof![
        Just(Vitals::NOT_RECORDED),
        (1.0f64..96.0, 1.0f64..700.0, proptest::option::of(0i64..=4_102_444_800_000)).prop_map(
            |(height, weight, observed_at)| Vitals {
                height,
                weight,
                observed_at,
            }
        ),
    ]
}

/// Generate a pharmacy, possibly the empty record.
pub fn pharmacy() -> impl Strategy<Value = PharmacyRecord> {
    prop_oneof![
        Just(PharmacyRecord::default()),
        (text(), text(), text(), proptest::option::of("[0-9]{7}")).prop_map(
            |(business_name, address_line_1, city, ncpdp_id)| PharmacyRecord {
                business_name,
                address_line_1,
                city,
                ncpdp_id,
            }
        ),
    ]
}

/// Generate a complete transmission context.
pub fn context() -> impl Strategy<Value = TransmissionContext> {
    (provider(), patient(), facility(), vitals(), pharmacy(), pharmacy()).prop_map(
        |(provider, patient, facility, vitals, primary, alternate)| {
            TransmissionContextBuilder::new(provider, patient)
                .facility(facility)
                .vitals(vitals)
                .primary_pharmacy(primary)
                .alternate_pharmacy(alternate)
                .build()
        },
    )
}
