//! Integration tests for the presence engine
//!
//! Turn-on, abort, clear delay, distance gating and calibration driven
//! end to end through `PresenceEngine::tick`.

use bedsense::core::PresenceEngine;
use bedsense::types::{
    Baseline, CalibrationEvent, CalibrationTermination, ChangeReason, DistanceWindow,
    EngineParams, PresenceState, Thresholds, Tick,
};
use pretty_assertions::assert_eq;

/// mean=100, spread=20, k_on=4, k_off=2, default timers
fn bench_engine() -> PresenceEngine {
    let mut params = EngineParams::default();
    params.thresholds = Thresholds { k_on: 4.0, k_off: 2.0 };
    PresenceEngine::with_params(Baseline::new(100.0, 20.0), params)
}

fn turned_on() -> PresenceEngine {
    let mut engine = bench_engine();
    engine.tick(Tick::new(185.0, 0));
    engine.tick(Tick::new(185.0, 3000));
    assert_eq!(engine.state(), PresenceState::Present);
    engine
}

#[test]
fn test_turn_on_after_debounce() {
    let mut engine = bench_engine();

    let out = engine.tick(Tick::new(185.0, 0));
    assert_eq!(out.z, Some(4.25));
    assert_eq!(out.state, PresenceState::DebouncingOn);
    assert!(!out.presence);
    assert!(out.transition.is_none());

    let out = engine.tick(Tick::new(185.0, 3000));
    assert_eq!(out.state, PresenceState::Present);
    assert!(out.presence);

    let transition = out.transition.expect("presence should flip");
    assert_eq!(transition.from, PresenceState::DebouncingOn);
    assert_eq!(transition.to, PresenceState::Present);
    assert_eq!(transition.elapsed_ms, 3000);
    assert_eq!(transition.change_reason, ChangeReason::ThresholdExceeded);
}

#[test]
fn test_debounce_not_yet_elapsed() {
    let mut engine = bench_engine();
    engine.tick(Tick::new(185.0, 0));
    let out = engine.tick(Tick::new(185.0, 2999));
    assert_eq!(out.state, PresenceState::DebouncingOn);
    assert!(!out.presence);
}

#[test]
fn test_abort_turn_on() {
    let mut engine = bench_engine();
    engine.tick(Tick::new(185.0, 0));

    let out = engine.tick(Tick::new(135.0, 2000));
    assert_eq!(out.z, Some(1.75));
    assert_eq!(out.state, PresenceState::Idle);
    assert!(!out.presence);
    assert!(out.transition.is_none());

    // A fresh run restarts the timer
    engine.tick(Tick::new(185.0, 2500));
    let out = engine.tick(Tick::new(185.0, 5000));
    assert_eq!(out.state, PresenceState::DebouncingOn);
}

#[test]
fn test_clear_delay_blocks_early_off() {
    let mut engine = turned_on();

    let out = engine.tick(Tick::new(110.0, 13000));
    assert_eq!(out.state, PresenceState::Present);
    assert!(out.presence);

    let out = engine.tick(Tick::new(110.0, 32999));
    assert_eq!(out.state, PresenceState::Present);
}

#[test]
fn test_full_clear_after_delay_and_debounce() {
    let mut engine = turned_on();

    let out = engine.tick(Tick::new(110.0, 33000));
    assert_eq!(out.state, PresenceState::DebouncingOff);
    assert!(out.presence);

    let out = engine.tick(Tick::new(110.0, 37999));
    assert_eq!(out.state, PresenceState::DebouncingOff);

    let out = engine.tick(Tick::new(110.0, 38000));
    assert_eq!(out.state, PresenceState::Idle);
    assert!(!out.presence);
    let transition = out.transition.expect("presence should clear");
    assert_eq!(transition.change_reason, ChangeReason::AbsClearDelay);
    assert_eq!(engine.change_reason().code(), "off:abs_clear_delay");
}

#[test]
fn test_strong_reading_refreshes_clear_delay() {
    let mut engine = turned_on();
    engine.tick(Tick::new(185.0, 20000));

    // 30s after t=3000 but only 13s after the refresh
    let out = engine.tick(Tick::new(110.0, 33000));
    assert_eq!(out.state, PresenceState::Present);

    let out = engine.tick(Tick::new(110.0, 50000));
    assert_eq!(out.state, PresenceState::DebouncingOff);
}

#[test]
fn test_middle_band_holds_debouncing_off() {
    let mut engine = turned_on();
    engine.tick(Tick::new(110.0, 33000));

    // 2 ≤ z < 4: neither side
    let out = engine.tick(Tick::new(160.0, 40000));
    assert_eq!(out.state, PresenceState::DebouncingOff);
    assert!(out.presence);

    // Timer was not restarted by the middle-band reading
    let out = engine.tick(Tick::new(110.0, 40001));
    assert_eq!(out.state, PresenceState::Idle);
}

#[test]
fn test_signal_return_aborts_turn_off() {
    let mut engine = turned_on();
    engine.tick(Tick::new(110.0, 33000));

    let out = engine.tick(Tick::new(185.0, 34000));
    assert_eq!(out.state, PresenceState::Present);
    assert!(out.transition.is_none());

    // The return refreshed the clear delay
    let out = engine.tick(Tick::new(110.0, 35000));
    assert_eq!(out.state, PresenceState::Present);
}

#[test]
fn test_distance_gate() {
    let mut params = EngineParams::default();
    params.thresholds = Thresholds { k_on: 4.0, k_off: 2.0 };
    params.window = DistanceWindow::new(50.0, 200.0);
    let mut engine = PresenceEngine::with_params(Baseline::new(100.0, 20.0), params);

    let out = engine.tick(Tick::with_distance(185.0, 300.0, 0));
    assert!(!out.admitted);
    assert_eq!(out.state, PresenceState::Idle);

    let out = engine.tick(Tick::with_distance(185.0, 10.0, 100));
    assert!(!out.admitted);
    assert_eq!(out.state, PresenceState::Idle);

    let out = engine.tick(Tick::with_distance(185.0, 120.0, 200));
    assert!(out.admitted);
    assert_eq!(out.state, PresenceState::DebouncingOn);

    // Rejected frames do not disturb a running debounce
    engine.tick(Tick::with_distance(0.0, 900.0, 1000));
    let out = engine.tick(Tick::with_distance(185.0, 120.0, 3200));
    assert_eq!(out.state, PresenceState::Present);
}

#[test]
fn test_window_bounds_inclusive_and_missing_distance_admitted() {
    let mut params = EngineParams::default();
    params.window = DistanceWindow::new(50.0, 200.0);
    let mut engine = PresenceEngine::with_params(Baseline::new(100.0, 20.0), params);

    assert!(engine.tick(Tick::with_distance(100.0, 50.0, 0)).admitted);
    assert!(engine.tick(Tick::with_distance(100.0, 200.0, 1)).admitted);
    assert!(engine.tick(Tick::new(100.0, 2)).admitted);
}

#[test]
fn test_missing_reading_leaves_state_alone() {
    let mut engine = bench_engine();
    engine.tick(Tick::new(185.0, 0));
    let out = engine.tick(Tick::empty(1000));
    assert_eq!(out.state, PresenceState::DebouncingOn);
    assert_eq!(out.z, None);
}

#[test]
fn test_calibration_capacity_early_exit() {
    let mut engine = bench_engine();
    let started = engine.start_calibration(600, 0);
    assert_eq!(started, CalibrationEvent::Started { duration_s: 600, deadline_ms: 600_000 });

    let mut finished = None;
    for i in 0..4096u64 {
        let out = engine.tick(Tick::new(100.0 + (i % 5) as f64, i + 1));
        if let Some(event) = out.calibration {
            finished = Some((i, event));
        }
    }

    let (at, event) = finished.expect("capacity should finalize");
    assert_eq!(at, 4095);
    match event {
        CalibrationEvent::Completed(summary) => {
            assert_eq!(summary.termination, CalibrationTermination::Capacity);
            assert_eq!(summary.samples, 4096);
            assert_eq!(summary.mean, 102.0);
            assert_eq!(summary.mad, 1.0);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(!engine.is_calibrating());
    assert_eq!(engine.baseline().mean, 102.0);
    assert!((engine.baseline().spread - 1.4826).abs() < 1e-9);
    assert_eq!(engine.change_reason(), ChangeReason::CalibrationCompleted);
}

#[test]
fn test_calibration_rejects_outlier() {
    let mut engine = bench_engine();
    engine.start_calibration(10, 0);
    for (i, e) in [120.0, 110.0, 130.0, 800.0].into_iter().enumerate() {
        engine.tick(Tick::new(e, i as u64 * 1000));
    }
    match engine.stop_calibration() {
        CalibrationEvent::Completed(summary) => {
            assert_eq!(summary.mean, 125.0);
            assert_eq!(summary.mad, 10.0);
            assert!((summary.spread - 14.826).abs() < 1e-9);
            assert_eq!(summary.termination, CalibrationTermination::Stopped);
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_constant_calibration_floors_spread() {
    let mut engine = bench_engine();
    engine.start_calibration(10, 0);
    for i in 0..20 {
        engine.tick(Tick::new(7.0, i * 100));
    }
    engine.stop_calibration();
    assert_eq!(engine.baseline(), Baseline::new(7.0, 0.05));
}

#[test]
fn test_calibration_without_samples_fails() {
    let mut engine = bench_engine();
    engine.start_calibration(2, 0);
    engine.tick(Tick::empty(1000));

    let out = engine.tick(Tick::new(185.0, 2000));
    assert_eq!(
        out.calibration,
        Some(CalibrationEvent::Failed { termination: CalibrationTermination::Deadline })
    );
    assert_eq!(engine.baseline(), Baseline::new(100.0, 20.0));
    assert_eq!(engine.change_reason().code(), "calibration:insufficient_samples");
    assert_eq!(engine.reason().to_string(), "Calibration failed: no samples");
}

#[test]
fn test_calibration_duration_capped() {
    let mut engine = bench_engine();
    let event = engine.start_calibration(3600, 1000);
    assert_eq!(event, CalibrationEvent::Started { duration_s: 600, deadline_ms: 601_000 });
}

#[test]
fn test_restart_discards_samples() {
    let mut engine = bench_engine();
    engine.start_calibration(10, 0);
    engine.tick(Tick::new(500.0, 100));
    engine.tick(Tick::new(500.0, 200));

    engine.start_calibration(10, 300);
    assert_eq!(engine.status().calibration.map(|p| p.samples), Some(0));
    engine.tick(Tick::new(90.0, 400));
    match engine.stop_calibration() {
        CalibrationEvent::Completed(summary) => assert_eq!(summary.mean, 90.0),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_stop_when_idle_is_ignored() {
    let mut engine = bench_engine();
    assert_eq!(engine.stop_calibration(), CalibrationEvent::StopIgnored);
    assert_eq!(engine.change_reason(), ChangeReason::Init);
}

#[test]
fn test_reset_while_present() {
    let mut engine = turned_on();
    engine.reset_to_defaults();

    let status = engine.status();
    assert_eq!(status.state, PresenceState::Idle);
    assert!(!status.presence);
    assert_eq!(status.change_reason.code(), "off:reset_to_defaults");
    assert_eq!(status.reason, "Reset to defaults");
    assert_eq!(status.params, EngineParams::default());
    assert_eq!(status.baseline, Baseline::default());
}
