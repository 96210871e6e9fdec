//! Engine configuration file (JSON)
//!
//! Every field is optional and falls back to the crate defaults. Ranges
//! follow the device schema: k_on/k_off in [0, 15], distances in [0, 1000] cm.
//! k_on > k_off is not checked here; the engine warns instead.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::PresenceEngine;
use crate::error::ConfigError;
use crate::types::{Baseline, DebounceConfig, DistanceWindow, EngineParams, Thresholds};
use crate::{
    DEFAULT_MEAN, DEFAULT_SPREAD, DEFAULT_K_ON, DEFAULT_K_OFF,
    DEFAULT_ON_DEBOUNCE_MS, DEFAULT_OFF_DEBOUNCE_MS, DEFAULT_ABS_CLEAR_DELAY_MS,
    DEFAULT_DISTANCE_MIN_CM, DEFAULT_DISTANCE_MAX_CM,
};

const K_RANGE: (f64, f64) = (0.0, 15.0);
const DISTANCE_RANGE: (f64, f64) = (0.0, 1000.0);

/// Initial engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub mean: f64,
    pub spread: f64,
    pub k_on: f64,
    pub k_off: f64,
    pub on_debounce_ms: u64,
    pub off_debounce_ms: u64,
    pub abs_clear_delay_ms: u64,
    pub distance_min_cm: f64,
    pub distance_max_cm: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mean: DEFAULT_MEAN,
            spread: DEFAULT_SPREAD,
            k_on: DEFAULT_K_ON,
            k_off: DEFAULT_K_OFF,
            on_debounce_ms: DEFAULT_ON_DEBOUNCE_MS,
            off_debounce_ms: DEFAULT_OFF_DEBOUNCE_MS,
            abs_clear_delay_ms: DEFAULT_ABS_CLEAR_DELAY_MS,
            distance_min_cm: DEFAULT_DISTANCE_MIN_CM,
            distance_max_cm: DEFAULT_DISTANCE_MAX_CM,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Range checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("k_on", self.k_on, K_RANGE)?;
        check_range("k_off", self.k_off, K_RANGE)?;
        check_range("distance_min_cm", self.distance_min_cm, DISTANCE_RANGE)?;
        check_range("distance_max_cm", self.distance_max_cm, DISTANCE_RANGE)?;
        check_range("spread", self.spread, (0.0, f64::MAX))?;
        if !self.mean.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "mean",
                value: self.mean,
                min: f64::MIN,
                max: f64::MAX,
            });
        }
        Ok(())
    }

    pub fn baseline(&self) -> Baseline {
        Baseline::new(self.mean, self.spread)
    }

    pub fn params(&self) -> EngineParams {
        EngineParams {
            thresholds: Thresholds { k_on: self.k_on, k_off: self.k_off },
            debounce: DebounceConfig {
                on_debounce_ms: self.on_debounce_ms,
                off_debounce_ms: self.off_debounce_ms,
                abs_clear_delay_ms: self.abs_clear_delay_ms,
            },
            window: DistanceWindow::new(self.distance_min_cm, self.distance_max_cm),
        }
    }

    /// Engine starting from this configuration
    pub fn build_engine(&self) -> PresenceEngine {
        PresenceEngine::with_params(self.baseline(), self.params())
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    // NaN fails both comparisons
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
