//! Canonical CBOR encoding for transmission contexts.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (measurements are fixed two-decimal text, timestamps are i64 ms)
//!
//! The same context always produces identical bytes, so a payload can be
//! decrypted and compared byte-for-byte during audits and tests.

use ciborium::value::Value;

use crate::context::{
    FacilityDescriptor, PatientInfo, PharmacyRecord, ProviderInfo, TransmissionContext, Vitals,
};
use crate::error::CoreError;
use crate::types::PatientId;

/// Current canonical layout version.
pub const CANONICAL_VERSION: u64 = 1;

/// Field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const PROVIDER_EMAIL: u64 = 1;
    pub const PROVIDER_NAME: u64 = 2;
    pub const PATIENT_ID: u64 = 3;
    pub const PATIENT_NAME: u64 = 4;
    pub const FACILITY: u64 = 5;
    pub const VITALS: u64 = 6;
    pub const PRIMARY_PHARMACY: u64 = 7;
    pub const ALTERNATE_PHARMACY: u64 = 8;

    pub mod facility {
        pub const NAME: u64 = 0;
        pub const STREET: u64 = 1;
        pub const CITY: u64 = 2;
        pub const STATE: u64 = 3;
        pub const POSTAL_CODE: u64 = 4;
        pub const PHONE: u64 = 5;
    }

    pub mod vitals {
        pub const HEIGHT: u64 = 0;
        pub const WEIGHT: u64 = 1;
        pub const OBSERVED_AT: u64 = 2;
    }

    pub mod pharmacy {
        pub const BUSINESS_NAME: u64 = 0;
        pub const ADDRESS_LINE_1: u64 = 1;
        pub const CITY: u64 = 2;
        pub const NCPDP_ID: u64 = 3;
    }
}

/// Encode a transmission context to canonical CBOR bytes.
///
/// Fails only if a measurement is not a finite number.
pub fn canonical_context_bytes(context: &TransmissionContext) -> Result<Vec<u8>, CoreError> {
    let value = context_to_cbor_value(context)?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

fn entry(key: u64, value: Value) -> (Value, Value) {
    (Value::Integer(key.into()), value)
}

fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

/// Convert a context to a CBOR Value (map with integer keys).
fn context_to_cbor_value(context: &TransmissionContext) -> Result<Value, CoreError> {
    let provider = context.provider();
    let patient = context.patient();

    Ok(Value::Map(vec![
        entry(keys::VERSION, Value::Integer(CANONICAL_VERSION.into())),
        entry(keys::PROVIDER_EMAIL, text(&provider.email)),
        entry(keys::PROVIDER_NAME, text(&provider.display_name)),
        entry(keys::PATIENT_ID, text(patient.id.as_str())),
        entry(keys::PATIENT_NAME, text(&patient.display_name)),
        entry(keys::FACILITY, facility_to_cbor_value(context.facility())),
        entry(keys::VITALS, vitals_to_cbor_value(context.vitals())?),
        entry(
            keys::PRIMARY_PHARMACY,
            pharmacy_to_cbor_value(context.primary_pharmacy()),
        ),
        entry(
            keys::ALTERNATE_PHARMACY,
            pharmacy_to_cbor_value(context.alternate_pharmacy()),
        ),
    ]))
}

fn facility_to_cbor_value(facility: &FacilityDescriptor) -> Value {
    use keys::facility as k;
    Value::Map(vec![
        entry(k::NAME, text(&facility.name)),
        entry(k::STREET, text(&facility.street)),
        entry(k::CITY, text(&facility.city)),
        entry(k::STATE, text(&facility.state)),
        entry(k::POSTAL_CODE, text(&facility.postal_code)),
        entry(k::PHONE, text(&facility.phone)),
    ])
}

fn vitals_to_cbor_value(vitals: &Vitals) -> Result<Value, CoreError> {
    use keys::vitals as k;
    let observed_at = match vitals.observed_at {
        Some(ms) => Value::Integer(ms.into()),
        None => Value::Null,
    };
    Ok(Value::Map(vec![
        entry(k::HEIGHT, measurement_value(vitals.height)?),
        entry(k::WEIGHT, measurement_value(vitals.weight)?),
        entry(k::OBSERVED_AT, observed_at),
    ]))
}

fn pharmacy_to_cbor_value(pharmacy: &PharmacyRecord) -> Value {
    use keys::pharmacy as k;
    let ncpdp = match &pharmacy.ncpdp_id {
        Some(id) => text(id),
        None => Value::Null,
    };
    Value::Map(vec![
        entry(k::BUSINESS_NAME, text(&pharmacy.business_name)),
        entry(k::ADDRESS_LINE_1, text(&pharmacy.address_line_1)),
        entry(k::CITY, text(&pharmacy.city)),
        entry(k::NCPDP_ID, ncpdp),
    ])
}

/// Render a measurement as fixed two-decimal text, or null if not recorded.
fn measurement_value(value: f64) -> Result<Value, CoreError> {
    if !value.is_finite() {
        return Err(CoreError::EncodingError(format!(
            "measurement is not finite: {}",
            value
        )));
    }
    if value <= 0.0 {
        return Ok(Value::Null);
    }
    Ok(Value::Text(format!("{:.2}", value)))
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a context from canonical bytes.
pub fn decode_context(bytes: &[u8]) -> Result<TransmissionContext, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = as_map(&value, "context")?;

    let version = match get(map, keys::VERSION) {
        Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedContext("negative version".into()))?,
        _ => return Err(CoreError::MalformedContext("missing version".into())),
    };
    if version != CANONICAL_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let provider = ProviderInfo {
        email: get_text(map, keys::PROVIDER_EMAIL, "provider_email")?,
        display_name: get_text(map, keys::PROVIDER_NAME, "provider_name")?,
    };

    let patient = PatientInfo {
        id: PatientId::new(get_text(map, keys::PATIENT_ID, "patient_id")?),
        display_name: get_text(map, keys::PATIENT_NAME, "patient_name")?,
    };

    let facility = match get(map, keys::FACILITY) {
        Some(v) => decode_facility(as_map(v, "facility")?)?,
        None => return Err(CoreError::MalformedContext("missing facility".into())),
    };

    let vitals = match get(map, keys::VITALS) {
        Some(Value::Null) | None => Vitals::NOT_RECORDED,
        Some(v) => decode_vitals(as_map(v, "vitals")?)?,
    };

    let primary = match get(map, keys::PRIMARY_PHARMACY) {
        Some(v) => decode_pharmacy(as_map(v, "primary_pharmacy")?)?,
        None => PharmacyRecord::default(),
    };

    let alternate = match get(map, keys::ALTERNATE_PHARMACY) {
        Some(v) => decode_pharmacy(as_map(v, "alternate_pharmacy")?)?,
        None => PharmacyRecord::default(),
    };

    Ok(
        crate::context::TransmissionContextBuilder::new(provider, patient)
            .facility(facility)
            .vitals(vitals)
            .primary_pharmacy(primary)
            .alternate_pharmacy(alternate)
            .build(),
    )
}

fn decode_facility(map: &[(Value, Value)]) -> Result<FacilityDescriptor, CoreError> {
    use keys::facility as k;
    Ok(FacilityDescriptor {
        name: get_text(map, k::NAME, "facility.name")?,
        street: get_text(map, k::STREET, "facility.street")?,
        city: get_text(map, k::CITY, "facility.city")?,
        state: get_text(map, k::STATE, "facility.state")?,
        postal_code: get_text(map, k::POSTAL_CODE, "facility.postal_code")?,
        phone: get_text(map, k::PHONE, "facility.phone")?,
    })
}

fn decode_vitals(map: &[(Value, Value)]) -> Result<Vitals, CoreError> {
    use keys::vitals as k;
    let parse = |key: u64, field: &str| -> Result<f64, CoreError> {
        match get(map, key) {
            Some(Value::Null) | None => Ok(0.0),
            Some(Value::Text(s)) => s
                .parse::<f64>()
                .map_err(|e| CoreError::MalformedContext(format!("{}: {}", field, e))),
            Some(_) => Err(CoreError::MalformedContext(format!("{}: expected text", field))),
        }
    };

    let observed_at = match get(map, k::OBSERVED_AT) {
        Some(Value::Integer(i)) => Some(
            i64::try_from(i128::from(*i))
                .map_err(|_| CoreError::MalformedContext("vitals.observed_at".into()))?,
        ),
        Some(Value::Null) | None => None,
        _ => return Err(CoreError::MalformedContext("vitals.observed_at".into())),
    };

    Ok(Vitals {
        height: parse(k::HEIGHT, "vitals.height")?,
        weight: parse(k::WEIGHT, "vitals.weight")?,
        observed_at,
    })
}

fn decode_pharmacy(map: &[(Value, Value)]) -> Result<PharmacyRecord, CoreError> {
    use keys::pharmacy as k;
    let ncpdp_id = match get(map, k::NCPDP_ID) {
        Some(Value::Text(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        _ => return Err(CoreError::MalformedContext("pharmacy.ncpdp_id".into())),
    };
    Ok(PharmacyRecord {
        business_name: get_text(map, k::BUSINESS_NAME, "pharmacy.business_name")?,
        address_line_1: get_text(map, k::ADDRESS_LINE_1, "pharmacy.address_line_1")?,
        city: get_text(map, k::CITY, "pharmacy.city")?,
        ncpdp_id,
    })
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)], CoreError> {
    match value {
        Value::Map(m) => Ok(m),
        _ => Err(CoreError::MalformedContext(format!("{}: expected map", what))),
    }
}

/// Look up a value by integer key.
fn get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
        .map(|(_, v)| v)
}

fn get_text(map: &[(Value, Value)], key: u64, field: &str) -> Result<String, CoreError> {
    match get(map, key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(CoreError::MalformedContext(format!("invalid {}", field))),
    }
}
