//! Output structures for terminal display and the API

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{
    Baseline, CalibrationEvent, ChangeReason, EngineParams, PresenceState, StateReason, TransitionEvent,
};

/// Output structure for each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutput {
    /// Wall-clock timestamp
    pub timestamp: DateTime<Utc>,
    /// Monotonic clock of the tick
    pub now_ms: u64,
    pub energy: Option<f64>,
    pub distance: Option<f64>,
    /// Passed the energy check and distance gate?
    pub admitted: bool,
    /// Score, only for admitted ticks
    pub z: Option<f64>,
    /// State after the tick
    pub state: PresenceState,
    pub presence: bool,
    /// Finalized presence change on this tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionEvent>,
    /// Calibration status change on this tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationEvent>,
}

impl TickOutput {
    /// Did anything a listener cares about happen?
    pub fn is_noteworthy(&self) -> bool {
        self.transition.is_some() || self.calibration.is_some()
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!("{} {}", self.state.symbol(), self.to_parseable_string());
        self.state.paint(&line).to_string()
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let z = match self.z {
            Some(z) => format!("{:.2}", z),
            None => "-".to_string(),
        };
        let mut line = format!(
            "t={}ms | z={} | state={} | presence={}",
            self.now_ms,
            z,
            self.state,
            if self.presence { "on" } else { "off" }
        );
        if let Some(ref t) = self.transition {
            line.push_str(&format!(" | change={}", t.change_reason.code()));
        }
        if let Some(ref c) = self.calibration {
            if let Some(code) = c.change_reason() {
                line.push_str(&format!(" | calibration={}", code.code()));
            }
        }
        line
    }
}

/// Calibration session progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub samples: usize,
    pub deadline_ms: u64,
}

/// Snapshot of everything observable about an engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: PresenceState,
    pub presence: bool,
    pub baseline: Baseline,
    pub params: EngineParams,
    /// Human-facing reason text
    pub reason: String,
    pub change_reason: ChangeReason,
    /// Typed form of `reason`
    pub reason_detail: StateReason,
    pub calibration: Option<CalibrationProgress>,
    pub ticks_seen: u64,
    pub ticks_admitted: u64,
}
