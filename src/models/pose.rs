/// Hand landmark and pose vector models
///
/// A `KeypointFrame` holds the landmarks reported by the detector for one
/// frame. It is flattened into a `RawPose` and then normalized exactly once
/// (center, then scale) into a `NormalizedPose`.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignatureError};

/// Norm below which a centered pose is considered degenerate
pub const DEGENERATE_NORM_EPSILON: f64 = 1e-6;

/// A detected 2D hand keypoint (normalized image coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Depth relative to the wrist; ignored by pose extraction
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Landmarks for a single detected hand in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointFrame {
    pub landmarks: Vec<Landmark>,
}

impl KeypointFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Check the frame carries exactly `expected` landmarks
    pub fn ensure_landmark_count(&self, expected: usize) -> Result<()> {
        if self.landmarks.len() != expected {
            return Err(SignatureError::InvalidLandmarkCount {
                expected,
                found: self.landmarks.len(),
            });
        }
        Ok(())
    }
}

/// Unnormalized pose: [x0, y0, x1, y1, ...]
#[derive(Debug, Clone, PartialEq)]
pub struct RawPose {
    values: Array1<f64>,
}

impl RawPose {
    pub fn from_values(values: Array1<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another raw pose
    pub fn distance_to(&self, other: &RawPose) -> Result<f64> {
        euclidean_distance(&self.values, &other.values)
    }

    /// Center on the scalar mean of all coordinates, then scale to unit L2 norm.
    ///
    /// A centered norm below `DEGENERATE_NORM_EPSILON` yields the centered
    /// vector unscaled with a reported scale of 0.
    pub fn normalize(&self) -> NormalizedPose {
        let mean = self.values.mean().unwrap_or(0.0);
        let centered = &self.values - mean;
        let norm = l2_norm(&centered);

        if norm < DEGENERATE_NORM_EPSILON {
            return NormalizedPose {
                values: centered,
                scale: 0.0,
            };
        }

        NormalizedPose {
            values: centered / norm,
            scale: norm,
        }
    }
}

/// Zero-mean, unit-norm pose plus the norm it was divided by
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPose {
    values: Array1<f64>,
    scale: f64,
}

impl NormalizedPose {
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }

    /// Pre-normalization norm of the centered pose (0 when degenerate)
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_degenerate(&self) -> bool {
        self.scale == 0.0
    }
}

pub fn l2_norm(values: &Array1<f64>) -> f64 {
    values.dot(values).sqrt()
}

/// Distance between two vectors of the same length; never broadcasts
pub fn euclidean_distance(a: &Array1<f64>, b: &Array1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SignatureError::Numeric(format!(
            "cannot measure distance between vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    let diff = a - b;
    Ok(l2_norm(&diff))
}
