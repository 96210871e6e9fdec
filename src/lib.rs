//! Bedsense: presence decision engine for a single occupancy sensor
//!
//! energy (+ optional distance) → distance gate → calibration → z-score
//! → four-state debounce machine → presence boolean

pub mod config;
pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// BASELINE DEFAULTS [C] - empty bed, still energy
// =============================================================================

/// Default baseline mean (still energy, percent)
pub const DEFAULT_MEAN: f64 = 6.7;

/// Default baseline spread (still energy, percent)
pub const DEFAULT_SPREAD: f64 = 3.5;

// =============================================================================
// THRESHOLDS [C]
// =============================================================================

/// z-score at or above which presence starts debouncing ON
pub const DEFAULT_K_ON: f64 = 9.0;

/// z-score below which presence starts debouncing OFF
pub const DEFAULT_K_OFF: f64 = 4.0;

// =============================================================================
// TIMERS [C] (milliseconds)
// =============================================================================

/// Sustained high signal required before PRESENT
pub const DEFAULT_ON_DEBOUNCE_MS: u64 = 3000;

/// Sustained low signal required before IDLE
pub const DEFAULT_OFF_DEBOUNCE_MS: u64 = 5000;

/// Minimum time since the last strong reading before clearing may start
pub const DEFAULT_ABS_CLEAR_DELAY_MS: u64 = 30000;

// =============================================================================
// DISTANCE WINDOW [C] (centimetres)
// =============================================================================

pub const DEFAULT_DISTANCE_MIN_CM: f64 = 0.0;
pub const DEFAULT_DISTANCE_MAX_CM: f64 = 600.0;

// =============================================================================
// SCORER + CALIBRATION [C]
// =============================================================================

/// Spreads at or below this are invalid; the scorer returns 0
pub const SPREAD_EPSILON: f64 = 0.001;

/// MAD → standard deviation under normality
pub const MAD_CONSISTENCY: f64 = 1.4826;

/// Lower bound for a calibrated spread
pub const MIN_CALIBRATED_SPREAD: f64 = 0.05;

/// Longest calibration run (seconds)
pub const MAX_CALIBRATION_SECS: u32 = 600;

/// Sample rate assumed when pre-sizing the calibration buffer
pub const ASSUMED_SAMPLES_PER_SEC: usize = 50;

/// Hard cap on calibration samples; reaching it finalizes early
pub const MAX_CALIBRATION_SAMPLES: usize = 4096;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.3.0";
