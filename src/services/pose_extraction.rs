/// Pose Extraction Service
///
/// Turns detector keypoints into pose vectors:
/// - Flattening landmarks into [x0, y0, x1, y1, ...] (no depth, no confidence)
/// - Translation/scale normalization (scalar mean centering, unit L2 norm)

use ndarray::Array1;

use crate::config::NUM_LANDMARKS;
use crate::error::Result;
use crate::models::pose::{KeypointFrame, NormalizedPose, RawPose};

/// Pose extractor for a fixed landmark count
#[derive(Debug, Clone)]
pub struct PoseExtractor {
    num_landmarks: usize,
}

impl PoseExtractor {
    /// Create an extractor for full-hand (21 landmark) frames
    pub fn new() -> Self {
        Self::with_landmark_count(NUM_LANDMARKS)
    }

    pub fn with_landmark_count(num_landmarks: usize) -> Self {
        Self { num_landmarks }
    }

    /// Dimension of the produced pose vectors
    pub fn pose_dim(&self) -> usize {
        self.num_landmarks * 2
    }

    /// Concatenate (x, y) of every landmark in landmark order
    pub fn extract(&self, frame: &KeypointFrame) -> Result<RawPose> {
        frame.ensure_landmark_count(self.num_landmarks)?;

        let values: Array1<f64> = frame
            .landmarks
            .iter()
            .flat_map(|lm| [lm.x as f64, lm.y as f64])
            .collect();

        Ok(RawPose::from_values(values))
    }

    /// Extract the raw pose and its normalized form
    pub fn extract_normalized(&self, frame: &KeypointFrame) -> Result<(RawPose, NormalizedPose)> {
        let raw = self.extract(frame)?;
        let normalized = raw.normalize();

        if normalized.is_degenerate() {
            tracing::debug!("Degenerate pose: centered norm below epsilon");
        }

        Ok((raw, normalized))
    }
}

impl Default for PoseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignatureError;
    use crate::models::pose::{l2_norm, Landmark};

    fn create_test_frame() -> KeypointFrame {
        let landmarks = (0..NUM_LANDMARKS)
            .map(|i| {
                let mut lm = Landmark::new(0.3 + i as f32 * 0.01, 0.6 - i as f32 * 0.02);
                lm.z = 5.0; // must be ignored
                lm
            })
            .collect();
        KeypointFrame::new(landmarks)
    }

    #[test]
    fn test_extract_flattens_xy_in_order() {
        let extractor = PoseExtractor::new();
        let raw = extractor.extract(&create_test_frame()).unwrap();

        assert_eq!(raw.dim(), 42);
        assert!((raw.values()[0] - 0.3).abs() < 1e-6);
        assert!((raw.values()[1] - 0.6).abs() < 1e-6);
        assert!((raw.values()[2] - 0.31).abs() < 1e-6);
        assert!((raw.values()[3] - 0.58).abs() < 1e-6);
        assert!(raw.values().iter().all(|v| *v < 1.0));
    }

    #[test]
    fn test_extract_rejects_wrong_landmark_count() {
        let extractor = PoseExtractor::new();
        let frame = KeypointFrame::new(vec![Landmark::new(0.5, 0.5); 5]);

        let result = extractor.extract(&frame);
        assert!(matches!(
            result,
            Err(SignatureError::InvalidLandmarkCount { expected: 21, found: 5 })
        ));
    }

    #[test]
    fn test_extract_normalized() {
        let extractor = PoseExtractor::new();
        let (raw, normalized) = extractor.extract_normalized(&create_test_frame()).unwrap();

        assert_eq!(raw.dim(), normalized.values().len());
        assert!((l2_norm(normalized.values()) - 1.0).abs() < 1e-9);
        assert!(normalized.values().sum().abs() < 1e-9);
        assert!(normalized.scale() > 0.0);
    }

    #[test]
    fn test_custom_landmark_count() {
        let extractor = PoseExtractor::with_landmark_count(2);
        let frame = KeypointFrame::new(vec![Landmark::new(0.0, 0.0), Landmark::new(1.0, 1.0)]);

        assert_eq!(extractor.pose_dim(), 4);
        assert_eq!(extractor.extract(&frame).unwrap().dim(), 4);
    }
}
