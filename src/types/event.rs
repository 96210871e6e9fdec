//! Events emitted by the state machine and the calibrator

use serde::{Deserialize, Serialize};
use crate::types::{ChangeReason, PresenceState};

/// A finalized presence change (DEBOUNCING_ON → PRESENT or DEBOUNCING_OFF → IDLE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from: PresenceState,
    pub to: PresenceState,
    /// Score on the committing tick
    pub z: f64,
    /// Time spent debouncing (milliseconds)
    pub elapsed_ms: u64,
    /// Clock value of the committing tick
    pub at_ms: u64,
    pub change_reason: ChangeReason,
}

impl TransitionEvent {
    /// Presence after the transition
    pub fn presence(&self) -> bool {
        self.to.presence()
    }
}

/// Why a calibration session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationTermination {
    /// Deadline reached
    Deadline,
    /// Sample buffer hit its hard capacity first
    Capacity,
    /// Explicit stop command
    Stopped,
}

impl std::fmt::Display for CalibrationTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Deadline => "deadline",
            Self::Capacity => "capacity",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    /// New baseline mean (sample median)
    pub mean: f64,
    /// New baseline spread (scaled MAD, floored)
    pub spread: f64,
    /// Raw median absolute deviation
    pub mad: f64,
    pub samples: usize,
    pub termination: CalibrationTermination,
}

/// Calibration status changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CalibrationEvent {
    Started { duration_s: u32, deadline_ms: u64 },
    /// Zero-duration request; nothing changed
    Rejected { requested_s: u32 },
    Completed(CalibrationSummary),
    /// Ended with an empty buffer; baseline untouched
    Failed { termination: CalibrationTermination },
    /// Stop requested while idle
    StopIgnored,
}

impl CalibrationEvent {
    /// Change-reason code published for this event, if any
    pub fn change_reason(&self) -> Option<ChangeReason> {
        match self {
            Self::Started { .. } => Some(ChangeReason::CalibrationStarted),
            Self::Completed(_) => Some(ChangeReason::CalibrationCompleted),
            Self::Failed { .. } => Some(ChangeReason::InsufficientSamples),
            Self::Rejected { .. } | Self::StopIgnored => None,
        }
    }

    /// Did this event end a session?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}
