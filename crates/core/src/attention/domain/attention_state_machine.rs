//! Debounced FOCUSED / DISTRACTED signal with asymmetric hysteresis.
//!
//! Any detected face restores FOCUSED immediately. DISTRACTED is only
//! reached once the time spent without a face adds up to the threshold,
//! so short detection dropouts never flip the status.

use std::time::Duration;

use thiserror::Error;

use crate::detection::domain::detection_result::DetectionResult;

use super::attention_status::AttentionStatus;

#[derive(Error, Debug, PartialEq)]
pub enum ThresholdError {
    #[error("distraction threshold must be a finite, non-negative number of seconds, got {0}")]
    Invalid(f64),
}

/// Converts a threshold in seconds, rejecting negative, NaN and overflowing values.
pub fn threshold_from_secs(secs: f64) -> Result<Duration, ThresholdError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ThresholdError::Invalid(secs))
}

#[derive(Clone, Debug)]
pub struct AttentionStateMachine {
    threshold: Duration,
    accumulated_absence: Duration,
    last_sample: Option<Duration>,
    status: AttentionStatus,
}

impl AttentionStateMachine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            accumulated_absence: Duration::ZERO,
            last_sample: None,
            status: AttentionStatus::Focused,
        }
    }

    /// Like [`new`](Self::new), but the first update measures from `started_at`.
    pub fn started_at(threshold: Duration, started_at: Duration) -> Self {
        Self {
            last_sample: Some(started_at),
            ..Self::new(threshold)
        }
    }

    /// Folds one tick's detections into the state and returns the status.
    ///
    /// The elapsed time since the previous sample is clamped at zero, so a
    /// clock that steps backwards never reduces the accumulated absence.
    pub fn update(&mut self, detections: &DetectionResult, now: Duration) -> AttentionStatus {
        let delta = self
            .last_sample
            .map_or(Duration::ZERO, |prev| now.saturating_sub(prev));
        self.last_sample = Some(now);

        if detections.has_face() {
            self.accumulated_absence = Duration::ZERO;
            self.status = AttentionStatus::Focused;
        } else {
            self.accumulated_absence = self.accumulated_absence.saturating_add(delta);
            if self.accumulated_absence >= self.threshold {
                self.status = AttentionStatus::Distracted;
            }
        }

        self.status
    }

    pub fn status(&self) -> AttentionStatus {
        self.status
    }

    pub fn accumulated_absence(&self) -> Duration {
        self.accumulated_absence
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::FaceRegion;
    use crate::shared::region::Region;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn face() -> DetectionResult {
        DetectionResult::new(vec![FaceRegion::new(Region::new(10, 10, 50, 50), vec![])])
    }

    fn no_face() -> DetectionResult {
        DetectionResult::none()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn machine(threshold_secs: f64) -> AttentionStateMachine {
        AttentionStateMachine::new(secs(threshold_secs))
    }

    #[test]
    fn test_initial_state() {
        let m = machine(2.0);
        assert_eq!(m.status(), AttentionStatus::Focused);
        assert_eq!(m.accumulated_absence(), Duration::ZERO);
    }

    #[test]
    fn test_first_update_has_zero_delta() {
        let mut m = machine(2.0);
        assert_eq!(m.update(&no_face(), secs(100.0)), AttentionStatus::Focused);
        assert_eq!(m.accumulated_absence(), Duration::ZERO);
    }

    #[test]
    fn test_started_at_measures_first_delta_from_start() {
        let mut m = AttentionStateMachine::started_at(secs(2.0), secs(10.0));
        assert_eq!(m.update(&no_face(), secs(12.5)), AttentionStatus::Distracted);
        assert_relative_eq!(m.accumulated_absence().as_secs_f64(), 2.5, epsilon = 1e-9);
    }

    // ── Hysteresis ───────────────────────────────────────────────────

    #[test]
    fn test_scenario_threshold_crossing() {
        let mut m = machine(2.0);
        assert_eq!(m.update(&face(), secs(0.0)), AttentionStatus::Focused);
        assert_eq!(m.update(&no_face(), secs(0.5)), AttentionStatus::Focused);
        assert_relative_eq!(m.accumulated_absence().as_secs_f64(), 0.5, epsilon = 1e-9);
        assert_eq!(m.update(&no_face(), secs(1.5)), AttentionStatus::Focused);
        assert_relative_eq!(m.accumulated_absence().as_secs_f64(), 1.5, epsilon = 1e-9);
        assert_eq!(m.update(&no_face(), secs(2.6)), AttentionStatus::Distracted);
        assert_relative_eq!(m.accumulated_absence().as_secs_f64(), 2.6, epsilon = 1e-9);
    }

    #[test]
    fn test_face_recovers_instantly() {
        let mut m = machine(2.0);
        m.update(&face(), secs(0.0));
        m.update(&no_face(), secs(3.0));
        assert_eq!(m.status(), AttentionStatus::Distracted);

        assert_eq!(m.update(&face(), secs(3.1)), AttentionStatus::Focused);
        assert_eq!(m.accumulated_absence(), Duration::ZERO);
    }

    #[test]
    fn test_reaching_threshold_exactly_distracts() {
        let mut m = machine(2.0);
        m.update(&face(), secs(0.0));
        assert_eq!(m.update(&no_face(), secs(2.0)), AttentionStatus::Distracted);
    }

    #[test]
    fn test_brief_gap_never_distracts() {
        let mut m = machine(2.0);
        m.update(&face(), secs(0.0));
        assert_eq!(m.update(&no_face(), secs(1.9)), AttentionStatus::Focused);
        assert_eq!(m.update(&face(), secs(1.95)), AttentionStatus::Focused);
        // Absence restarted, so another 1.9s gap is still below the threshold
        assert_eq!(m.update(&no_face(), secs(3.85)), AttentionStatus::Focused);
    }

    #[test]
    fn test_distracted_is_sticky_without_face() {
        let mut m = machine(1.0);
        m.update(&face(), secs(0.0));
        m.update(&no_face(), secs(1.0));
        for t in [1.1, 1.2, 5.0, 50.0] {
            assert_eq!(m.update(&no_face(), secs(t)), AttentionStatus::Distracted);
        }
    }

    #[test]
    fn test_eyes_do_not_affect_status() {
        let mut m = machine(2.0);
        let face_without_eyes = face();
        let face_with_eyes = DetectionResult::new(vec![FaceRegion::new(
            Region::new(0, 0, 40, 40),
            vec![Region::new(5, 5, 5, 5)],
        )]);
        assert_eq!(m.update(&face_without_eyes, secs(0.0)), AttentionStatus::Focused);
        assert_eq!(m.update(&face_with_eyes, secs(5.0)), AttentionStatus::Focused);
    }

    #[test]
    fn test_zero_threshold_distracts_on_first_missing_face() {
        let mut m = machine(0.0);
        assert_eq!(m.update(&no_face(), secs(0.0)), AttentionStatus::Distracted);
    }

    // ── Clock irregularities ─────────────────────────────────────────

    #[test]
    fn test_backwards_clock_is_clamped() {
        let mut m = machine(2.0);
        m.update(&no_face(), secs(10.0));
        m.update(&no_face(), secs(11.0));
        assert_eq!(m.update(&no_face(), secs(5.0)), AttentionStatus::Focused);
        assert_relative_eq!(m.accumulated_absence().as_secs_f64(), 1.0, epsilon = 1e-9);

        // The next delta is measured from the stepped-back reading
        assert_eq!(m.update(&no_face(), secs(6.0)), AttentionStatus::Distracted);
    }

    // ── Threshold parsing ────────────────────────────────────────────

    #[rstest]
    #[case(0.0)]
    #[case(2.0)]
    #[case(0.25)]
    fn test_threshold_from_valid_secs(#[case] s: f64) {
        assert_eq!(threshold_from_secs(s).unwrap(), secs(s));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_threshold_from_invalid_secs(#[case] s: f64) {
        assert!(threshold_from_secs(s).is_err());
    }
}
