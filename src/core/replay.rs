//! Replay driver: feeds recorded ticks through an engine and keeps a report

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::core::PresenceEngine;
use crate::types::{CalibrationEvent, EngineStatus, Tick, TickOutput, TransitionEvent};

/// Summary of a replayed log
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub ticks: u64,
    pub admitted: u64,
    pub transitions: Vec<TransitionEvent>,
    pub calibrations: Vec<CalibrationEvent>,
    pub final_status: EngineStatus,
}

/// Replay driver
#[derive(Debug)]
pub struct Replay {
    engine: PresenceEngine,
    /// Calibration to start on the first tick (seconds)
    pending_calibration: Option<u32>,
    started_at: DateTime<Utc>,
    ticks: u64,
    admitted: u64,
    transitions: Vec<TransitionEvent>,
    calibrations: Vec<CalibrationEvent>,
}

impl Replay {
    pub fn new(engine: PresenceEngine) -> Self {
        Self {
            engine,
            pending_calibration: None,
            started_at: Utc::now(),
            ticks: 0,
            admitted: 0,
            transitions: Vec::new(),
            calibrations: Vec::new(),
        }
    }

    /// Start a calibration of `duration_s` at the first tick's clock
    pub fn with_calibration(mut self, duration_s: u32) -> Self {
        self.pending_calibration = Some(duration_s);
        self
    }

    /// Feed one tick
    pub fn feed(&mut self, tick: Tick) -> TickOutput {
        if let Some(duration_s) = self.pending_calibration.take() {
            let event = self.engine.start_calibration(duration_s, tick.now_ms);
            self.calibrations.push(event);
        }

        let mut output = self.engine.tick(tick);
        if !output.admitted {
            // The clock still runs without a usable reading
            output.calibration = self.engine.poll(tick.now_ms);
        }
        self.ticks += 1;
        if output.admitted {
            self.admitted += 1;
        }
        if let Some(ref t) = output.transition {
            self.transitions.push(t.clone());
        }
        if let Some(ref c) = output.calibration {
            self.calibrations.push(c.clone());
        }
        output
    }

    pub fn engine(&self) -> &PresenceEngine {
        &self.engine
    }

    /// End of log. A calibration still running is finalized as stopped.
    pub fn finish(mut self) -> ReplayReport {
        if self.engine.is_calibrating() {
            tracing::info!("log ended during calibration, finalizing");
            let event = self.engine.stop_calibration();
            self.calibrations.push(event);
        }
        ReplayReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            ticks: self.ticks,
            admitted: self.admitted,
            transitions: self.transitions,
            calibrations: self.calibrations,
            final_status: self.engine.status(),
        }
    }
}
