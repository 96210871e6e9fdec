//! Anomaly scorer: z = (energy - μ) / σ against the still baseline

use crate::SPREAD_EPSILON;
use crate::types::Baseline;

/// Standardized deviation of `reading` from `baseline`.
///
/// A spread at or below `SPREAD_EPSILON`, or a non-finite one, yields 0 so
/// the state machine never sees NaN from a degenerate baseline.
pub fn score(reading: f64, baseline: &Baseline) -> f64 {
    if !baseline.spread.is_finite() || baseline.spread <= SPREAD_EPSILON {
        tracing::warn!(spread = baseline.spread, "invalid spread, returning z=0");
        return 0.0;
    }
    (reading - baseline.mean) / baseline.spread
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_score() {
        let baseline = Baseline::new(100.0, 20.0);
        assert_eq!(score(185.0, &baseline), 4.25);
        assert_eq!(score(135.0, &baseline), 1.75);
        assert_eq!(score(60.0, &baseline), -2.0);
    }

    #[test]
    fn test_exact_formula() {
        let baseline = Baseline::new(6.7, 3.5);
        for reading in [-1e9, -3.0, 0.0, 6.7, 42.5, 1e12] {
            assert_eq!(score(reading, &baseline), (reading - 6.7) / 3.5);
        }
    }

    #[test]
    fn test_degenerate_spread_is_neutral() {
        for spread in [0.001, 0.0005, 0.0, -4.0] {
            let baseline = Baseline::new(10.0, spread);
            assert_eq!(score(1e6, &baseline), 0.0);
            assert_eq!(score(-1e6, &baseline), 0.0);
        }
    }

    #[test]
    fn test_non_finite_spread_is_neutral() {
        for spread in [f64::INFINITY, f64::NAN] {
            let baseline = Baseline::new(10.0, spread);
            assert_eq!(score(1e6, &baseline), 0.0);
        }
    }

    #[test]
    fn test_huge_reading_never_nan() {
        let baseline = Baseline::new(1e308, 0.05);
        let z = score(-1e308, &baseline);
        assert!(!z.is_nan());
        assert!(z < 0.0);
    }

    #[test]
    fn test_just_above_epsilon_divides() {
        let baseline = Baseline::new(0.0, 0.002);
        assert_eq!(score(1.0, &baseline), 500.0);
    }
}
