//! Distance gate: hard filter on the optional secondary reading

use crate::types::DistanceWindow;

/// Admit a tick unless its distance lies strictly outside `window`.
/// No distance reading always admits.
pub fn admit(distance: Option<f64>, window: &DistanceWindow) -> bool {
    match distance {
        None => true,
        Some(d) => d >= window.min && d <= window.max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_distance_admits() {
        let window = DistanceWindow::new(50.0, 200.0);
        assert!(admit(None, &window));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let window = DistanceWindow::new(50.0, 200.0);
        assert!(admit(Some(50.0), &window));
        assert!(admit(Some(125.0), &window));
        assert!(admit(Some(200.0), &window));
    }

    #[test]
    fn test_outside_rejects() {
        let window = DistanceWindow::new(50.0, 200.0);
        assert!(!admit(Some(49.9), &window));
        assert!(!admit(Some(200.1), &window));
        assert!(!admit(Some(-1.0), &window));
    }

    #[test]
    fn test_nan_distance_rejects() {
        let window = DistanceWindow::default();
        assert!(!admit(Some(f64::NAN), &window));
    }
}
