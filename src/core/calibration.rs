//! Baseline calibration: bounded sample window → median / scaled MAD
//!
//! A session ends on the first of: deadline, buffer capacity, explicit stop.
//! Median-based estimates keep a person walking through the window from
//! dragging the baseline.

use crate::{
    ASSUMED_SAMPLES_PER_SEC, MAD_CONSISTENCY, MAX_CALIBRATION_SAMPLES,
    MAX_CALIBRATION_SECS, MIN_CALIBRATED_SPREAD,
};
use crate::types::{CalibrationEvent, CalibrationProgress, CalibrationSummary, CalibrationTermination};

/// Median by partial selection. Reorders `values`; `None` when empty.
///
/// Even counts average the two central order statistics: after selecting
/// the upper-middle element, the lower-middle is the largest value left of it.
/// Halves are summed so two values near `f64::MAX` stay finite.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let odd = values.len() % 2 == 1;
    let (left, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *upper;
    if odd {
        return Some(upper);
    }
    let lower = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(lower / 2.0 + upper / 2.0)
}

/// Robust location and scale of a sample set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustEstimate {
    pub median: f64,
    pub mad: f64,
    /// mad × 1.4826 clamped to [floor, f64::MAX]
    pub spread: f64,
}

/// Median, MAD and floored spread; `None` for an empty set
pub fn robust_estimate(samples: &[f64]) -> Option<RobustEstimate> {
    let mut work = samples.to_vec();
    let center = median(&mut work)?;

    for (dev, &x) in work.iter_mut().zip(samples) {
        *dev = (x - center).abs();
    }
    let mad = median(&mut work)?;
    // Deviations between extreme readings can overflow
    let spread = (mad * MAD_CONSISTENCY).clamp(MIN_CALIBRATED_SPREAD, f64::MAX);

    Some(RobustEstimate { median: center, mad, spread })
}

/// Calibration session state
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    active: bool,
    started_ms: u64,
    duration_ms: u64,
    deadline_ms: u64,
    samples: Vec<f64>,
}

impl Calibrator {
    /// Create an idle calibrator
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session of `duration_s` seconds (capped at 600).
    /// Zero is rejected; an active session is restarted from scratch.
    pub fn start(&mut self, duration_s: u32, now_ms: u64) -> CalibrationEvent {
        if duration_s == 0 {
            tracing::warn!("ignoring calibration request with 0s duration");
            return CalibrationEvent::Rejected { requested_s: 0 };
        }

        let clamped = duration_s.min(MAX_CALIBRATION_SECS);
        if clamped != duration_s {
            tracing::info!(requested_s = duration_s, clamped_s = clamped, "calibration duration capped");
        }

        let expected = clamped as usize * ASSUMED_SAMPLES_PER_SEC;
        self.samples = Vec::with_capacity(expected.min(MAX_CALIBRATION_SAMPLES));
        self.active = true;
        self.started_ms = now_ms;
        self.duration_ms = clamped as u64 * 1000;
        self.deadline_ms = now_ms.wrapping_add(self.duration_ms);

        tracing::info!(duration_s = clamped, deadline_ms = self.deadline_ms, "starting baseline calibration");
        CalibrationEvent::Started { duration_s: clamped, deadline_ms: self.deadline_ms }
    }

    /// Add an admitted sample. Hitting capacity finalizes immediately.
    pub fn record(&mut self, sample: f64) -> Option<CalibrationEvent> {
        if !self.active {
            return None;
        }
        self.samples.push(sample);
        if self.samples.len() >= MAX_CALIBRATION_SAMPLES {
            tracing::warn!(samples = self.samples.len(), "calibration buffer full, finalizing early");
            return self.finalize(CalibrationTermination::Capacity);
        }
        None
    }

    /// Finalize if the session has run its full duration. Measured from the
    /// start so a deadline past the clock wrap still waits.
    pub fn check_deadline(&mut self, now_ms: u64) -> Option<CalibrationEvent> {
        if self.active && now_ms.wrapping_sub(self.started_ms) >= self.duration_ms {
            return self.finalize(CalibrationTermination::Deadline);
        }
        None
    }

    /// Explicit stop; a warning no-op when idle
    pub fn stop(&mut self) -> CalibrationEvent {
        if !self.active {
            tracing::warn!("calibration stop requested, but no calibration in progress");
            return CalibrationEvent::StopIgnored;
        }
        self.finalize(CalibrationTermination::Stopped)
            .unwrap_or(CalibrationEvent::StopIgnored)
    }

    /// End the session and compute the baseline. No-op when idle.
    pub fn finalize(&mut self, termination: CalibrationTermination) -> Option<CalibrationEvent> {
        if !self.active {
            return None;
        }
        self.active = false;
        let samples = std::mem::take(&mut self.samples);

        let Some(estimate) = robust_estimate(&samples) else {
            tracing::warn!(%termination, "calibration finished with no samples collected");
            return Some(CalibrationEvent::Failed { termination });
        };

        tracing::info!(
            mean = estimate.median,
            spread = estimate.spread,
            samples = samples.len(),
            %termination,
            "calibration complete"
        );
        Some(CalibrationEvent::Completed(CalibrationSummary {
            mean: estimate.median,
            spread: estimate.spread,
            mad: estimate.mad,
            samples: samples.len(),
            termination,
        }))
    }

    /// Drop any session without computing anything
    pub fn cancel(&mut self) {
        self.active = false;
        self.samples.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Progress of the running session
    pub fn progress(&self) -> Option<CalibrationProgress> {
        self.active.then(|| CalibrationProgress {
            samples: self.samples.len(),
            deadline_ms: self.deadline_ms,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
