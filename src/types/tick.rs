//! Per-tick sensor input

use serde::{Deserialize, Serialize};

/// One reading from the periodic driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Primary signal; `None` means no reading this tick
    pub energy: Option<f64>,
    /// Optional secondary reading for the distance gate
    #[serde(default)]
    pub distance: Option<f64>,
    /// Monotonic clock (milliseconds)
    pub now_ms: u64,
}

impl Tick {
    /// Energy-only tick
    pub fn new(energy: f64, now_ms: u64) -> Self {
        Self { energy: Some(energy), distance: None, now_ms }
    }

    /// Tick carrying a distance reading
    pub fn with_distance(energy: f64, distance: f64, now_ms: u64) -> Self {
        Self { energy: Some(energy), distance: Some(distance), now_ms }
    }

    /// Tick with no energy reading available
    pub fn empty(now_ms: u64) -> Self {
        Self { energy: None, distance: None, now_ms }
    }
}
