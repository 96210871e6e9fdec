//! Core types for Bedsense

mod state;
mod reason;
mod params;
mod event;
mod tick;
mod output;

pub use state::PresenceState;
pub use reason::{ChangeReason, StateReason};
pub use params::{Baseline, Thresholds, DebounceConfig, DistanceWindow, EngineParams};
pub use event::{TransitionEvent, CalibrationEvent, CalibrationSummary, CalibrationTermination};
pub use tick::Tick;
pub use output::{TickOutput, CalibrationProgress, EngineStatus};
