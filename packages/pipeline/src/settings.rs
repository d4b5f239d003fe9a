//! Run settings with TOML file support.
//!
//! Every knob has a production default, so an absent or empty settings
//! file yields a working configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::PipelineError;
use crate::rate::RateBudget;

/// Tunable parameters for one enrichment run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineSettings {
    /// Lookup calls allowed per rate period.
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,

    /// Length of the rate period, in seconds.
    #[serde(default = "default_rate_period_secs")]
    pub rate_period_secs: f64,

    /// Maximum number of rows enriched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Hard deadline for a single row, in seconds.
    #[serde(default = "default_row_timeout_secs")]
    pub row_timeout_secs: f64,

    /// Model identifier sent to the lookup service.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rate_capacity: default_rate_capacity(),
            rate_period_secs: default_rate_period_secs(),
            concurrency: default_concurrency(),
            row_timeout_secs: default_row_timeout_secs(),
            model: default_model(),
        }
    }
}

impl PipelineSettings {
    /// Parses settings from a TOML string. Absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML is malformed or a key has the
    /// wrong type.
    pub fn from_toml_str(raw: &str) -> Result<Self, PipelineError> {
        Ok(toml::de::from_str(raw)?)
    }

    /// Reads and parses a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// The rate budget for a run with these settings.
    #[must_use]
    pub fn rate_budget(&self) -> RateBudget {
        RateBudget::new(self.rate_capacity, secs(self.rate_period_secs, 5.0))
    }

    /// The per-row deadline.
    #[must_use]
    pub fn row_timeout(&self) -> Duration {
        secs(self.row_timeout_secs, 60.0)
    }
}

/// Converts a configured seconds value to a [`Duration`], falling back
/// when the value is negative or not finite.
fn secs(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

fn default_rate_capacity() -> u32 {
    5
}

fn default_rate_period_secs() -> f64 {
    5.0
}

fn default_concurrency() -> usize {
    5
}

fn default_row_timeout_secs() -> f64 {
    60.0
}

fn default_model() -> String {
    prospektor_lookup::DEFAULT_MODEL.to_string()
}
