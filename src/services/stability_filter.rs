// Frame-to-frame stability gate on raw (unnormalized) poses

use crate::error::Result;
use crate::models::pose::RawPose;

/// Outcome of feeding one frame through the filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StabilityDecision {
    /// No previous frame to compare with
    FirstFrame,
    Stable { delta: f64 },
    Moving { delta: f64 },
}

impl StabilityDecision {
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }

    pub fn delta(&self) -> Option<f64> {
        match self {
            Self::FirstFrame => None,
            Self::Stable { delta } | Self::Moving { delta } => Some(*delta),
        }
    }
}

/// Accepts a frame iff it moved less than `threshold` since the previous one.
///
/// Only the previous raw pose is remembered; no smoothing or hysteresis.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    threshold: f64,
    previous: Option<RawPose>,
}

impl StabilityFilter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare against the previous pose, then remember `pose` as the new previous
    pub fn observe(&mut self, pose: &RawPose) -> Result<StabilityDecision> {
        let decision = match &self.previous {
            None => StabilityDecision::FirstFrame,
            Some(previous) => {
                let delta = pose.distance_to(previous)?;
                if delta < self.threshold {
                    StabilityDecision::Stable { delta }
                } else {
                    StabilityDecision::Moving { delta }
                }
            }
        };

        self.previous = Some(pose.clone());
        Ok(decision)
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn pose(x: f64) -> RawPose {
        RawPose::from_values(array![x, 0.5])
    }

    #[test]
    fn test_first_frame_never_accepted() {
        let mut filter = StabilityFilter::new(0.03);
        let decision = filter.observe(&pose(0.5)).unwrap();
        assert_eq!(decision, StabilityDecision::FirstFrame);
        assert!(!decision.is_stable());
        assert_eq!(decision.delta(), None);
    }

    #[test]
    fn test_small_movement_is_stable() {
        let mut filter = StabilityFilter::new(0.03);
        filter.observe(&pose(0.5)).unwrap();
        let decision = filter.observe(&pose(0.51)).unwrap();
        assert!(decision.is_stable());
        assert!((decision.delta().unwrap() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut filter = StabilityFilter::new(0.25);
        filter.observe(&pose(0.5)).unwrap();
        // delta == threshold is rejected
        assert!(!filter.observe(&pose(0.75)).unwrap().is_stable());
    }

    #[test]
    fn test_compares_only_against_previous_frame() {
        let mut filter = StabilityFilter::new(0.03);
        filter.observe(&pose(0.50)).unwrap();
        filter.observe(&pose(0.52)).unwrap();
        filter.observe(&pose(0.54)).unwrap();
        // 0.04 from the first frame, but only 0.02 from the previous one
        assert!(filter.observe(&pose(0.56)).unwrap().is_stable());

        assert!(matches!(
            filter.observe(&pose(0.9)).unwrap(),
            StabilityDecision::Moving { .. }
        ));
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut filter = StabilityFilter::new(0.03);
        filter.observe(&pose(0.5)).unwrap();
        filter.reset();
        assert_eq!(filter.observe(&pose(0.5)).unwrap(), StabilityDecision::FirstFrame);
    }
}
