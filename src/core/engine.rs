//! Presence engine: one sensing volume, one presence boolean
//!
//! Per tick: distance gate → calibration sample → score → state machine.
//! All state lives in the instance; commands and ticks must come from the
//! same execution context.

use chrono::Utc;
use crate::core::calibration::Calibrator;
use crate::core::gate::admit;
use crate::core::presence::PresenceMachine;
use crate::core::scorer::score;
use crate::types::{
    Baseline, CalibrationEvent, ChangeReason, EngineParams, EngineStatus, PresenceState,
    StateReason, Tick, TickOutput, TransitionEvent,
};

/// Presence decision engine
#[derive(Debug, Clone)]
pub struct PresenceEngine {
    /// Still-energy reference written by calibration
    baseline: Baseline,
    /// Runtime-tunable thresholds, timers and window
    params: EngineParams,
    machine: PresenceMachine,
    calibrator: Calibrator,
    /// Last human-facing reason
    reason: StateReason,
    /// Last machine-readable change code
    change_reason: ChangeReason,
    ticks_seen: u64,
    ticks_admitted: u64,
}

impl Default for PresenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceEngine {
    /// Create engine with the documented defaults
    pub fn new() -> Self {
        Self::with_params(Baseline::default(), EngineParams::default())
    }

    /// Create engine from loaded parameters
    pub fn with_params(baseline: Baseline, params: EngineParams) -> Self {
        if params.thresholds.is_inverted() {
            warn_inverted(&params);
        }
        Self {
            baseline,
            params,
            machine: PresenceMachine::new(),
            calibrator: Calibrator::new(),
            reason: StateReason::Initial,
            change_reason: ChangeReason::Init,
            ticks_seen: 0,
            ticks_admitted: 0,
        }
    }

    /// Process one reading
    pub fn tick(&mut self, tick: Tick) -> TickOutput {
        self.ticks_seen += 1;

        // Non-finite energy is a sensor without a state
        let Some(energy) = tick.energy.filter(|e| e.is_finite()) else {
            return self.output(tick, None, None, None);
        };

        if !admit(tick.distance, &self.params.window) {
            tracing::trace!(
                distance = tick.distance,
                min = self.params.window.min,
                max = self.params.window.max,
                "ignoring frame outside distance window"
            );
            return self.output(tick, None, None, None);
        }
        self.ticks_admitted += 1;

        let calibration = self
            .calibrator
            .check_deadline(tick.now_ms)
            .or_else(|| self.calibrator.record(energy));
        if let Some(ref event) = calibration {
            self.apply_calibration(event);
        }

        let z = score(energy, &self.baseline);
        tracing::trace!(energy, z, state = %self.machine.state(), "scored");

        let transition = self.machine.advance(
            z,
            tick.now_ms,
            &self.params.thresholds,
            &self.params.debounce,
        );
        if let Some(ref event) = transition {
            self.reason = match event.to {
                PresenceState::Present => StateReason::On { z, debounced_ms: event.elapsed_ms },
                _ => StateReason::Off { z, debounced_ms: event.elapsed_ms },
            };
            self.change_reason = event.change_reason;
        }

        self.output(tick, Some(z), transition, calibration)
    }

    /// Clock-only check: finalize an expired calibration without a reading
    pub fn poll(&mut self, now_ms: u64) -> Option<CalibrationEvent> {
        let event = self.calibrator.check_deadline(now_ms)?;
        self.apply_calibration(&event);
        Some(event)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Start (or restart) baseline calibration
    pub fn start_calibration(&mut self, duration_s: u32, now_ms: u64) -> CalibrationEvent {
        let event = self.calibrator.start(duration_s, now_ms);
        self.apply_calibration(&event);
        event
    }

    /// Finalize the running calibration now
    pub fn stop_calibration(&mut self) -> CalibrationEvent {
        let event = self.calibrator.stop();
        self.apply_calibration(&event);
        event
    }

    /// Restore documented defaults, drop calibration, force IDLE
    pub fn reset_to_defaults(&mut self) {
        tracing::info!("resetting engine parameters to defaults");
        self.baseline = Baseline::default();
        self.params = EngineParams::default();
        self.calibrator.cancel();
        self.machine.reset();
        self.reason = StateReason::Reset;
        self.change_reason = ChangeReason::ResetToDefaults;
    }

    pub fn set_k_on(&mut self, k: f64) {
        tracing::info!("updating k_on: {:.2} -> {:.2}", self.params.thresholds.k_on, k);
        self.params.thresholds.k_on = k;
        self.check_thresholds();
    }

    pub fn set_k_off(&mut self, k: f64) {
        tracing::info!("updating k_off: {:.2} -> {:.2}", self.params.thresholds.k_off, k);
        self.params.thresholds.k_off = k;
        self.check_thresholds();
    }

    pub fn set_on_debounce_ms(&mut self, ms: u64) {
        tracing::info!("updating on_debounce_ms: {} -> {}", self.params.debounce.on_debounce_ms, ms);
        self.params.debounce.on_debounce_ms = ms;
    }

    pub fn set_off_debounce_ms(&mut self, ms: u64) {
        tracing::info!("updating off_debounce_ms: {} -> {}", self.params.debounce.off_debounce_ms, ms);
        self.params.debounce.off_debounce_ms = ms;
    }

    pub fn set_abs_clear_delay_ms(&mut self, ms: u64) {
        tracing::info!(
            "updating abs_clear_delay_ms: {} -> {}",
            self.params.debounce.abs_clear_delay_ms,
            ms
        );
        self.params.debounce.abs_clear_delay_ms = ms;
    }

    pub fn set_distance_min(&mut self, value: f64) {
        tracing::info!("updating distance min: {:.1} -> {:.1}", self.params.window.min, value);
        self.params.window.min = value;
    }

    pub fn set_distance_max(&mut self, value: f64) {
        tracing::info!("updating distance max: {:.1} -> {:.1}", self.params.window.max, value);
        self.params.window.max = value;
    }

    /// Replace every tunable at once
    pub fn set_params(&mut self, params: EngineParams) {
        tracing::info!(?params, "replacing engine parameters");
        self.params = params;
        self.check_thresholds();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> PresenceState {
        self.machine.state()
    }

    pub fn presence(&self) -> bool {
        self.machine.presence()
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn reason(&self) -> &StateReason {
        &self.reason
    }

    pub fn change_reason(&self) -> ChangeReason {
        self.change_reason
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_active()
    }

    /// Snapshot without advancing anything
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state(),
            presence: self.presence(),
            baseline: self.baseline,
            params: self.params,
            reason: self.reason.to_string(),
            change_reason: self.change_reason,
            reason_detail: self.reason.clone(),
            calibration: self.calibrator.progress(),
            ticks_seen: self.ticks_seen,
            ticks_admitted: self.ticks_admitted,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Publish calibration outcome; a completed run overwrites the baseline
    fn apply_calibration(&mut self, event: &CalibrationEvent) {
        match event {
            CalibrationEvent::Started { duration_s, .. } => {
                self.reason = StateReason::CalibrationStarted { duration_s: *duration_s };
            }
            CalibrationEvent::Completed(summary) => {
                self.baseline = Baseline::new(summary.mean, summary.spread);
                self.reason = StateReason::CalibrationCompleted {
                    mean: summary.mean,
                    spread: summary.spread,
                    samples: summary.samples,
                };
            }
            CalibrationEvent::Failed { .. } => {
                self.reason = StateReason::CalibrationFailed;
            }
            CalibrationEvent::Rejected { .. } | CalibrationEvent::StopIgnored => return,
        }
        if let Some(code) = event.change_reason() {
            self.change_reason = code;
        }
    }

    fn check_thresholds(&self) {
        if self.params.thresholds.is_inverted() {
            warn_inverted(&self.params);
        }
    }

    fn output(
        &self,
        tick: Tick,
        z: Option<f64>,
        transition: Option<TransitionEvent>,
        calibration: Option<CalibrationEvent>,
    ) -> TickOutput {
        TickOutput {
            timestamp: Utc::now(),
            now_ms: tick.now_ms,
            energy: tick.energy,
            distance: tick.distance,
            admitted: z.is_some(),
            z,
            state: self.state(),
            presence: self.presence(),
            transition,
            calibration,
        }
    }
}

fn warn_inverted(params: &EngineParams) {
    tracing::warn!(
        k_on = params.thresholds.k_on,
        k_off = params.thresholds.k_off,
        "k_on <= k_off: hysteresis band is empty, presence may oscillate"
    );
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CalibrationTermination, DistanceWindow, Thresholds};
    use crate::{DEFAULT_K_ON, DEFAULT_MEAN, DEFAULT_SPREAD};

    fn test_engine() -> PresenceEngine {
        let mut params = EngineParams::default();
        params.thresholds = Thresholds { k_on: 4.0, k_off: 2.0 };
        PresenceEngine::with_params(Baseline::new(100.0, 20.0), params)
    }

    #[test]
    fn test_initial_status() {
        let engine = PresenceEngine::new();
        let status = engine.status();
        assert_eq!(status.state, PresenceState::Idle);
        assert!(!status.presence);
        assert_eq!(status.change_reason, ChangeReason::Init);
        assert_eq!(status.reason, "Initial state: IDLE");
        assert_eq!(status.baseline, Baseline::new(DEFAULT_MEAN, DEFAULT_SPREAD));
    }

    #[test]
    fn test_missing_energy_is_noop() {
        let mut engine = test_engine();
        engine.start_calibration(10, 0);
        let out = engine.tick(Tick::empty(500));
        assert!(!out.admitted);
        assert_eq!(out.z, None);
        assert_eq!(engine.status().calibration.unwrap().samples, 0);
        assert_eq!(engine.status().ticks_admitted, 0);
    }

    #[test]
    fn test_nan_energy_is_noop() {
        let mut engine = test_engine();
        let out = engine.tick(Tick::new(f64::NAN, 0));
        assert!(!out.admitted);
        assert_eq!(engine.state(), PresenceState::Idle);
    }

    #[test]
    fn test_gate_blocks_calibration_sampling() {
        let mut engine = test_engine();
        engine.set_distance_min(50.0);
        engine.set_distance_max(200.0);
        engine.start_calibration(10, 0);
        engine.tick(Tick::with_distance(110.0, 10.0, 100));
        assert_eq!(engine.status().calibration.unwrap().samples, 0);
        engine.tick(Tick::with_distance(110.0, 100.0, 200));
        assert_eq!(engine.status().calibration.unwrap().samples, 1);
    }

    #[test]
    fn test_transition_sets_reasons() {
        let mut engine = test_engine();
        engine.tick(Tick::new(185.0, 0));
        let out = engine.tick(Tick::new(185.0, 3000));
        assert!(out.transition.is_some());
        assert_eq!(engine.change_reason(), ChangeReason::ThresholdExceeded);
        assert_eq!(engine.reason().to_string(), "ON: z=4.25, debounced 3000ms");
    }

    #[test]
    fn test_calibration_updates_baseline_used_for_scoring() {
        let mut engine = test_engine();
        engine.start_calibration(1, 0);
        for (i, e) in [120.0, 110.0, 130.0, 800.0].into_iter().enumerate() {
            engine.tick(Tick::new(e, i as u64 * 100));
        }
        // deadline tick finalizes before scoring; its sample is not recorded
        let out = engine.tick(Tick::new(125.0, 1000));
        match out.calibration {
            Some(CalibrationEvent::Completed(summary)) => {
                assert_eq!(summary.samples, 4);
                assert_eq!(summary.termination, CalibrationTermination::Deadline);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(engine.baseline().mean, 125.0);
        assert_eq!(out.z, Some(0.0));
        assert_eq!(engine.change_reason(), ChangeReason::CalibrationCompleted);
    }

    #[test]
    fn test_huge_calibration_readings_keep_scores_defined() {
        let mut engine = test_engine();
        engine.start_calibration(10, 0);
        engine.tick(Tick::new(1e308, 100));
        engine.tick(Tick::new(1e308, 200));
        engine.stop_calibration();

        let baseline = engine.baseline();
        assert_eq!(baseline.mean, 1e308);
        assert!(baseline.spread.is_finite());

        let out = engine.tick(Tick::new(100.0, 300));
        let z = out.z.unwrap();
        assert!(!z.is_nan());
        assert!(z < 0.0);
        assert_eq!(engine.state(), PresenceState::Idle);
    }

    #[test]
    fn test_poll_finalizes_without_reading() {
        let mut engine = test_engine();
        engine.start_calibration(5, 0);
        assert!(engine.poll(4999).is_none());
        let event = engine.poll(5000).unwrap();
        assert_eq!(event, CalibrationEvent::Failed { termination: CalibrationTermination::Deadline });
        assert_eq!(engine.change_reason(), ChangeReason::InsufficientSamples);
        assert_eq!(engine.baseline(), Baseline::new(100.0, 20.0));
    }

    #[test]
    fn test_rejected_calibration_keeps_reason() {
        let mut engine = test_engine();
        let event = engine.start_calibration(0, 0);
        assert_eq!(event, CalibrationEvent::Rejected { requested_s: 0 });
        assert!(!engine.is_calibrating());
        assert_eq!(engine.change_reason(), ChangeReason::Init);
    }

    #[test]
    fn test_setters_take_effect_next_tick() {
        let mut engine = test_engine();
        engine.set_on_debounce_ms(0);
        engine.tick(Tick::new(185.0, 0));
        engine.tick(Tick::new(185.0, 0));
        assert!(engine.presence());

        engine.set_k_off(5.0);
        engine.set_abs_clear_delay_ms(0);
        engine.set_off_debounce_ms(0);
        engine.tick(Tick::new(185.0, 10)); // z=4.25 < k_off=5.0
        assert_eq!(engine.state(), PresenceState::DebouncingOff);
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut engine = test_engine();
        engine.set_on_debounce_ms(0);
        engine.set_distance_max(10.0);
        engine.tick(Tick::new(185.0, 0));
        engine.tick(Tick::new(185.0, 1));
        engine.start_calibration(60, 1);
        engine.tick(Tick::new(150.0, 2));

        engine.reset_to_defaults();

        assert_eq!(engine.state(), PresenceState::Idle);
        assert!(!engine.presence());
        assert!(!engine.is_calibrating());
        assert_eq!(engine.change_reason(), ChangeReason::ResetToDefaults);
        assert_eq!(engine.baseline(), Baseline::default());
        assert_eq!(engine.params().thresholds.k_on, DEFAULT_K_ON);
        assert_eq!(engine.params().window, DistanceWindow::default());
    }

    #[test]
    fn test_inverted_thresholds_accepted() {
        let mut engine = test_engine();
        engine.set_k_on(1.0);
        engine.set_k_off(3.0);
        assert_eq!(engine.params().thresholds, Thresholds { k_on: 1.0, k_off: 3.0 });
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = test_engine();
        let b = test_engine();
        a.set_on_debounce_ms(0);
        a.tick(Tick::new(185.0, 0));
        a.tick(Tick::new(185.0, 0));
        assert!(a.presence());
        assert!(!b.presence());
        assert_eq!(b.params().debounce.on_debounce_ms, 3000);
    }
}
