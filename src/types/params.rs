//! Runtime-tunable engine parameters

use serde::{Deserialize, Serialize};
use crate::{
    DEFAULT_MEAN, DEFAULT_SPREAD, DEFAULT_K_ON, DEFAULT_K_OFF,
    DEFAULT_ON_DEBOUNCE_MS, DEFAULT_OFF_DEBOUNCE_MS, DEFAULT_ABS_CLEAR_DELAY_MS,
    DEFAULT_DISTANCE_MIN_CM, DEFAULT_DISTANCE_MAX_CM,
};

/// "No presence" reference distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    /// Must stay ≥ 0; at or below `SPREAD_EPSILON` the scorer returns 0
    pub spread: f64,
}

impl Baseline {
    pub fn new(mean: f64, spread: f64) -> Self {
        Self { mean, spread }
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::new(DEFAULT_MEAN, DEFAULT_SPREAD)
    }
}

/// Hysteresis thresholds in z units. Expected k_on > k_off, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub k_on: f64,
    pub k_off: f64,
}

impl Thresholds {
    /// Would the two debounce states both be immediately satisfiable?
    pub fn is_inverted(&self) -> bool {
        self.k_on <= self.k_off
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { k_on: DEFAULT_K_ON, k_off: DEFAULT_K_OFF }
    }
}

/// Timer durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    pub on_debounce_ms: u64,
    pub off_debounce_ms: u64,
    pub abs_clear_delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            on_debounce_ms: DEFAULT_ON_DEBOUNCE_MS,
            off_debounce_ms: DEFAULT_OFF_DEBOUNCE_MS,
            abs_clear_delay_ms: DEFAULT_ABS_CLEAR_DELAY_MS,
        }
    }
}

/// Inclusive distance window, same unit as the distance reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceWindow {
    pub min: f64,
    pub max: f64,
}

impl DistanceWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Default for DistanceWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE_MIN_CM, DEFAULT_DISTANCE_MAX_CM)
    }
}

/// Everything the parameter setters can change. The baseline is not here:
/// only calibration (or a reset) writes it after construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineParams {
    pub thresholds: Thresholds,
    pub debounce: DebounceConfig,
    pub window: DistanceWindow,
}
