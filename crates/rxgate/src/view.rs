//! Everything the page shell needs to render an outcome.
//!
//! These types carry display strings only. Rendering (markup, scripts,
//! translations) belongs to the host.

use std::time::Duration;

use rxgate_core::{TransmissionContext, Vitals};
use url::Url;

/// Query parameter the page shell uses to request a key reset.
pub const RESET_PARAM: &str = "form_reset_key";

/// Shown when the payload could not be built.
pub const CIPHER_FAILURE_MESSAGE: &str = "Cipher failure check encryption key";

/// Shown before redirecting away on an infrastructure failure.
pub const NETWORK_UNAVAILABLE_MESSAGE: &str =
    "Internet connection problem. Returning to Patient chart when alert closes!";

/// Formatted vitals, present only when both measurements were recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitalsDisplay {
    pub height: String,
    pub weight: String,
    /// Unix milliseconds, left for the host to format.
    pub observed_at: Option<i64>,
}

impl VitalsDisplay {
    fn from_vitals(vitals: &Vitals) -> Option<Self> {
        vitals.is_recorded().then(|| Self {
            height: format!("{:.2}", vitals.height),
            weight: format!("{:.2}", vitals.weight),
            observed_at: vitals.observed_at,
        })
    }
}

/// The confirmation view rendered alongside the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeView {
    pub prescriber: String,
    pub patient_name: String,
    pub facility_name: String,
    pub vitals: Option<VitalsDisplay>,
    pub primary_pharmacy: String,
    pub alternate_pharmacy: String,
    /// Link back to the patient chart.
    pub return_link: Url,
}

impl ComposeView {
    pub fn from_context(context: &TransmissionContext, return_link: Url) -> Self {
        Self {
            prescriber: context.provider().display_name.clone(),
            patient_name: context.patient().display_name.clone(),
            facility_name: context.facility().name.clone(),
            vitals: VitalsDisplay::from_vitals(context.vitals()),
            primary_pharmacy: context.primary_pharmacy().summary(),
            alternate_pharmacy: context.alternate_pharmacy().summary(),
            return_link,
        }
    }
}

/// A transient notice shown to the clinician.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub lines: Vec<String>,
    pub display_for: Duration,
}

impl Notice {
    pub fn network_unavailable(display_for: Duration) -> Self {
        Self {
            lines: vec![NETWORK_UNAVAILABLE_MESSAGE.to_string()],
            display_for,
        }
    }

    pub fn key_invalid(display_for: Duration) -> Self {
        Self {
            lines: vec![
                "Decryption failed! The Encryption key is incorrect".to_string(),
                "Click newly shown top Reset button to reset your account encryption key."
                    .to_string(),
                "Afterwards you may continue and no other action is required by you.".to_string(),
            ],
            display_for,
        }
    }
}

/// The control offered when the key must be reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetControl {
    pub label: &'static str,
    pub title: &'static str,
    /// Parameter the control submits to request the reset.
    pub param: &'static str,
}

impl Default for ResetControl {
    fn default() -> Self {
        Self {
            label: "Session is invalid!. Click to Reset?",
            title: "The Encryption key did not pass validation. \
                    Clicking this button will reset your encryption key so you may continue.",
            param: RESET_PARAM,
        }
    }
}

/// A delayed navigation away from the compose page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: Url,
    pub after: Duration,
}
