// =============================================================================
// Runtime Configuration
// =============================================================================
//
// Every tunable assumption of the valuation engine in one JSON document. All
// fields carry `#[serde(default)]` so an older or partial file still loads;
// a missing file is an error the caller can answer by falling back to
// `RuntimeConfig::default()`.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::IndicatorConfig;
use crate::valuation::DcfConfig;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_min_history() -> usize {
    200
}

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Sections
// =============================================================================

/// Settings for the share-price prediction path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Minimum number of daily closes before features are assembled.
    #[serde(default = "default_min_history")]
    pub min_history: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_history: default_min_history(),
        }
    }
}

/// Alpha Vantage REST adapter settings. The API key is not stored here; it
/// comes from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaVantageConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the valuation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Growth, discount and horizon assumptions for the DCF model.
    #[serde(default)]
    pub dcf: DcfConfig,

    /// Indicator periods and RSI saturation mode.
    #[serde(default)]
    pub indicators: IndicatorConfig,

    #[serde(default)]
    pub prediction: PredictionConfig,

    #[serde(default)]
    pub alpha_vantage: AlphaVantageConfig,
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// The DCF section is validated here so that a bad discount rate is
    /// reported at startup rather than on the first valuation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        config
            .dcf
            .validate()
            .with_context(|| format!("invalid DCF section in {}", path.display()))?;

        info!(
            path = %path.display(),
            discount_rate = config.dcf.discount_rate,
            perpetual_growth_rate = config.dcf.perpetual_growth_rate,
            rsi_saturation = ?config.indicators.rsi_saturation,
            "runtime config loaded"
        );

        Ok(config)
    }
}
