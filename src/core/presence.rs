//! Presence state machine: hysteresis with two debounce timers and an
//! absolute clear delay
//!
//! State transitions (z = score, k_on > k_off expected):
//! - IDLE → DEBOUNCING_ON: z ≥ k_on
//! - DEBOUNCING_ON → PRESENT: z ≥ k_on held for on_debounce
//! - DEBOUNCING_ON → IDLE: z < k_on (abort)
//! - PRESENT → DEBOUNCING_OFF: z < k_off and abs_clear_delay since last z > k_on
//! - DEBOUNCING_OFF → IDLE: z < k_off held for off_debounce
//! - DEBOUNCING_OFF → PRESENT: z ≥ k_on (abort)

use crate::types::{ChangeReason, DebounceConfig, PresenceState, Thresholds, TransitionEvent};

/// Milliseconds from `since` to `now`, tolerant of clock wraparound
fn elapsed(now: u64, since: u64) -> u64 {
    now.wrapping_sub(since)
}

/// Presence state machine
#[derive(Debug, Clone)]
pub struct PresenceMachine {
    /// Current state
    state: PresenceState,
    /// When the running debounce started
    debounce_start_ms: u64,
    /// Last tick with z > k_on while present
    last_high_confidence_ms: u64,
}

impl Default for PresenceMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceMachine {
    /// Create new machine in IDLE
    pub fn new() -> Self {
        Self {
            state: PresenceState::Idle,
            debounce_start_ms: 0,
            last_high_confidence_ms: 0,
        }
    }

    /// Advance one admitted tick. Returns the event when presence flips.
    pub fn advance(
        &mut self,
        z: f64,
        now: u64,
        thresholds: &Thresholds,
        debounce: &DebounceConfig,
    ) -> Option<TransitionEvent> {
        let Thresholds { k_on, k_off } = *thresholds;

        match self.state {
            PresenceState::Idle => {
                if z >= k_on {
                    self.debounce_start_ms = now;
                    self.state = PresenceState::DebouncingOn;
                    tracing::debug!(z, k_on, "IDLE → DEBOUNCING_ON");
                }
                None
            }

            PresenceState::DebouncingOn => {
                // NaN aborts too
                if z < k_on || z.is_nan() {
                    self.state = PresenceState::Idle;
                    tracing::debug!(z, k_on, "DEBOUNCING_ON → IDLE (abort)");
                    return None;
                }
                let held = elapsed(now, self.debounce_start_ms);
                if held < debounce.on_debounce_ms {
                    return None;
                }
                self.state = PresenceState::Present;
                self.last_high_confidence_ms = now;
                let event = TransitionEvent {
                    from: PresenceState::DebouncingOn,
                    to: PresenceState::Present,
                    z,
                    elapsed_ms: held,
                    at_ms: now,
                    change_reason: ChangeReason::ThresholdExceeded,
                };
                tracing::info!(z, debounced_ms = held, "DEBOUNCING_ON → PRESENT");
                Some(event)
            }

            PresenceState::Present => {
                if z > k_on {
                    self.last_high_confidence_ms = now;
                }
                if z < k_off {
                    let since_high = elapsed(now, self.last_high_confidence_ms);
                    if since_high >= debounce.abs_clear_delay_ms {
                        self.debounce_start_ms = now;
                        self.state = PresenceState::DebouncingOff;
                        tracing::debug!(z, k_off, since_high, "PRESENT → DEBOUNCING_OFF");
                    }
                }
                None
            }

            PresenceState::DebouncingOff => {
                if z < k_off {
                    let held = elapsed(now, self.debounce_start_ms);
                    if held < debounce.off_debounce_ms {
                        return None;
                    }
                    self.state = PresenceState::Idle;
                    let event = TransitionEvent {
                        from: PresenceState::DebouncingOff,
                        to: PresenceState::Idle,
                        z,
                        elapsed_ms: held,
                        at_ms: now,
                        change_reason: ChangeReason::AbsClearDelay,
                    };
                    tracing::info!(z, debounced_ms = held, "DEBOUNCING_OFF → IDLE");
                    Some(event)
                } else {
                    if z >= k_on {
                        self.state = PresenceState::Present;
                        self.last_high_confidence_ms = now;
                        tracing::debug!(z, k_on, "DEBOUNCING_OFF → PRESENT (signal returned)");
                    }
                    None
                }
            }
        }
    }

    /// Get current state
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Published presence boolean
    pub fn presence(&self) -> bool {
        self.state.presence()
    }

    /// Start of the running debounce, if any
    pub fn debounce_started_at(&self) -> Option<u64> {
        self.state.is_debouncing().then_some(self.debounce_start_ms)
    }

    /// Last strong reading seen while present
    pub fn last_high_confidence_ms(&self) -> u64 {
        self.last_high_confidence_ms
    }

    /// Back to IDLE
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// =============================================================================
// TESTS
// =============================================================================
