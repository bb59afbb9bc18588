//! Gate configuration.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{GateError, Result};

/// Path of the compose endpoint under the network base.
pub const COMPOSE_PATH: &str = "ComposeRx";

/// Path of the patient summary view under the web root.
pub const PATIENT_SUMMARY_PATH: &str = "interface/patient_file/summary/demographics.php";

/// Configuration for the transmission orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Base URL of the prescribing network's compose UI.
    pub network_base: String,
    /// Base URL of the EHR, used for the patient summary redirect.
    pub web_root: String,
    /// How long transient-failure notices stay up before redirecting.
    pub warning_interval_ms: u64,
    /// Issue a new key automatically when validation finds it invalid,
    /// instead of surfacing the reset control. At most once per request.
    pub auto_reset_on_invalid: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            network_base: "https://online.wenoexchange.com/en/NewRx/".into(),
            web_root: "http://localhost/".into(),
            warning_interval_ms: 8000,
            auto_reset_on_invalid: false,
        }
    }
}

impl GateConfig {
    /// Parse configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GateError::Config(e.to_string()))
    }

    /// The warning interval as a duration.
    pub fn warning_interval(&self) -> Duration {
        Duration::from_millis(self.warning_interval_ms)
    }

    /// Resolve the configured bases into concrete endpoints.
    pub(crate) fn endpoints(&self) -> Result<Endpoints> {
        let network_base = parse_base(&self.network_base, "network_base")?;
        if network_base.scheme() != "https" {
            return Err(GateError::Config(format!(
                "network_base must use https: {}",
                self.network_base
            )));
        }
        let web_root = parse_base(&self.web_root, "web_root")?;

        let compose = network_base
            .join(COMPOSE_PATH)
            .map_err(|e| GateError::Config(format!("compose endpoint: {}", e)))?;
        let patient_summary = web_root
            .join(PATIENT_SUMMARY_PATH)
            .map_err(|e| GateError::Config(format!("patient summary endpoint: {}", e)))?;

        Ok(Endpoints {
            compose,
            patient_summary,
        })
    }
}

/// Resolved endpoint URLs, without query strings.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    pub compose: Url,
    pub patient_summary: Url,
}

/// Parse a base URL, making sure it ends in a slash so joins append.
fn parse_base(raw: &str, field: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| GateError::Config(format!("{}: {}", field, e)))?;
    if url.cannot_be_a_base() {
        return Err(GateError::Config(format!("{} cannot be a base URL: {}", field, raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
