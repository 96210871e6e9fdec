//! Reasons attached to presence changes and calibration status
//!
//! Two channels: a terse machine-readable change code and a typed
//! human-facing reason rendered only at the presentation edge.

use serde::{Deserialize, Serialize};

/// Machine-readable change-reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeReason {
    /// Engine constructed
    #[serde(rename = "idle:init")]
    Init,
    /// On-debounce elapsed with z ≥ k_on
    #[serde(rename = "on:threshold_exceeded")]
    ThresholdExceeded,
    /// Off-debounce elapsed after the absolute clear delay
    #[serde(rename = "off:abs_clear_delay")]
    AbsClearDelay,
    /// Parameters and state restored to defaults
    #[serde(rename = "off:reset_to_defaults")]
    ResetToDefaults,
    #[serde(rename = "calibration:started")]
    CalibrationStarted,
    #[serde(rename = "calibration:completed")]
    CalibrationCompleted,
    /// Calibration ended without any sample
    #[serde(rename = "calibration:insufficient_samples")]
    InsufficientSamples,
}

impl ChangeReason {
    /// Get the code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Init => "idle:init",
            Self::ThresholdExceeded => "on:threshold_exceeded",
            Self::AbsClearDelay => "off:abs_clear_delay",
            Self::ResetToDefaults => "off:reset_to_defaults",
            Self::CalibrationStarted => "calibration:started",
            Self::CalibrationCompleted => "calibration:completed",
            Self::InsufficientSamples => "calibration:insufficient_samples",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Init => "Engine initialised",
            Self::ThresholdExceeded => "Presence confirmed above k_on",
            Self::AbsClearDelay => "Presence cleared below k_off",
            Self::ResetToDefaults => "Reset to defaults",
            Self::CalibrationStarted => "Baseline calibration running",
            Self::CalibrationCompleted => "Baseline calibration applied",
            Self::InsufficientSamples => "Calibration collected no samples",
        }
    }
}

impl std::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Typed free-text reason for the current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateReason {
    Initial,
    On { z: f64, debounced_ms: u64 },
    Off { z: f64, debounced_ms: u64 },
    CalibrationStarted { duration_s: u32 },
    CalibrationCompleted { mean: f64, spread: f64, samples: usize },
    CalibrationFailed,
    Reset,
}

impl std::fmt::Display for StateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "Initial state: IDLE"),
            Self::On { z, debounced_ms } => write!(f, "ON: z={:.2}, debounced {}ms", z, debounced_ms),
            Self::Off { z, debounced_ms } => write!(f, "OFF: z={:.2}, debounced {}ms", z, debounced_ms),
            Self::CalibrationStarted { duration_s } => {
                write!(f, "Calibration started ({}s)", duration_s)
            }
            Self::CalibrationCompleted { mean, spread, samples } => write!(
                f,
                "Calibration complete: μ={:.2}, σ={:.2}, n={}",
                mean, spread, samples
            ),
            Self::CalibrationFailed => write!(f, "Calibration failed: no samples"),
            Self::Reset => write!(f, "Reset to defaults"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_serde_names() {
        for reason in [
            ChangeReason::Init,
            ChangeReason::ThresholdExceeded,
            ChangeReason::AbsClearDelay,
            ChangeReason::ResetToDefaults,
            ChangeReason::CalibrationStarted,
            ChangeReason::CalibrationCompleted,
            ChangeReason::InsufficientSamples,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
    }

    #[test]
    fn test_reason_text() {
        let on = StateReason::On { z: 4.25, debounced_ms: 3000 };
        assert_eq!(on.to_string(), "ON: z=4.25, debounced 3000ms");

        let done = StateReason::CalibrationCompleted { mean: 125.0, spread: 14.826, samples: 4 };
        assert_eq!(done.to_string(), "Calibration complete: μ=125.00, σ=14.83, n=4");
    }
}
