// Pipeline configuration shared by the trainer and the optimizer

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignatureError};

/// Landmarks produced per hand by the detector
pub const NUM_LANDMARKS: usize = 21;

/// Pose vector dimension: (x, y) per landmark
pub const POSE_DIM: usize = NUM_LANDMARKS * 2;

/// What the trainer does with samples whose centered norm is near zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Aggregate them like any other sample
    Keep,
    /// Drop them before aggregation
    Skip,
}

/// Vector-space optimization stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    FeatureScaling,
    Amplification,
    PcaWhitening,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Maximum raw-frame delta for a frame to count as stable
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,

    #[serde(default = "default_min_stable_frames")]
    pub min_stable_frames: usize,

    /// Percentile of intra-class distances used as the threshold base
    #[serde(default = "default_threshold_percentile")]
    pub threshold_percentile: f64,

    #[serde(default = "default_threshold_margin")]
    pub threshold_margin: f64,

    /// Thresholds above this trigger a re-capture warning
    #[serde(default = "default_max_recommended_threshold")]
    pub max_recommended_threshold: f64,

    #[serde(default = "default_degenerate_policy")]
    pub degenerate_policy: DegeneratePolicy,

    #[serde(default = "default_min_confidence")]
    pub min_detection_confidence: f32,

    #[serde(default = "default_min_confidence")]
    pub min_tracking_confidence: f32,

    #[serde(default = "default_num_landmarks")]
    pub num_landmarks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Centroid-deviation multiplier; 1.0 disables amplification
    #[serde(default = "default_amplification_factor")]
    pub amplification_factor: f64,

    #[serde(default = "default_true")]
    pub enable_pca_whitening: bool,

    #[serde(default = "default_true")]
    pub enable_feature_scaling: bool,

    #[serde(default = "default_true")]
    pub enable_threshold_recompute: bool,

    #[serde(default = "default_stage_order")]
    pub stage_order: Vec<StageKind>,

    #[serde(default = "default_eigenvalue_floor")]
    pub eigenvalue_floor: f64,

    #[serde(default = "default_threshold_margin")]
    pub threshold_margin: f64,
}

// Default value functions
fn default_stability_threshold() -> f64 {
    0.03
}

fn default_min_stable_frames() -> usize {
    5
}

fn default_threshold_percentile() -> f64 {
    95.0
}

fn default_threshold_margin() -> f64 {
    1.2
}

fn default_max_recommended_threshold() -> f64 {
    0.2
}

fn default_degenerate_policy() -> DegeneratePolicy {
    DegeneratePolicy::Keep
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_num_landmarks() -> usize {
    NUM_LANDMARKS
}

fn default_amplification_factor() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

fn default_stage_order() -> Vec<StageKind> {
    vec![
        StageKind::FeatureScaling,
        StageKind::Amplification,
        StageKind::PcaWhitening,
    ]
}

fn default_eigenvalue_floor() -> f64 {
    1e-5
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            stability_threshold: default_stability_threshold(),
            min_stable_frames: default_min_stable_frames(),
            threshold_percentile: default_threshold_percentile(),
            threshold_margin: default_threshold_margin(),
            max_recommended_threshold: default_max_recommended_threshold(),
            degenerate_policy: default_degenerate_policy(),
            min_detection_confidence: default_min_confidence(),
            min_tracking_confidence: default_min_confidence(),
            num_landmarks: default_num_landmarks(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            amplification_factor: default_amplification_factor(),
            enable_pca_whitening: default_true(),
            enable_feature_scaling: default_true(),
            enable_threshold_recompute: default_true(),
            stage_order: default_stage_order(),
            eigenvalue_floor: default_eigenvalue_floor(),
            threshold_margin: default_threshold_margin(),
        }
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SignatureError::InvalidConfig(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("stability_threshold", self.stability_threshold)?;
        ensure_positive("threshold_margin", self.threshold_margin)?;
        ensure_positive("max_recommended_threshold", self.max_recommended_threshold)?;

        if self.min_stable_frames == 0 {
            return Err(SignatureError::InvalidConfig(
                "min_stable_frames must be at least 1".to_string(),
            ));
        }
        if !(self.threshold_percentile > 0.0 && self.threshold_percentile <= 100.0) {
            return Err(SignatureError::InvalidConfig(format!(
                "threshold_percentile must be in (0, 100], got {}",
                self.threshold_percentile
            )));
        }
        if self.num_landmarks == 0 {
            return Err(SignatureError::InvalidConfig(
                "num_landmarks must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Pose vector dimension for this landmark count
    pub fn pose_dim(&self) -> usize {
        self.num_landmarks * 2
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("amplification_factor", self.amplification_factor)?;
        ensure_positive("eigenvalue_floor", self.eigenvalue_floor)?;
        ensure_positive("threshold_margin", self.threshold_margin)?;

        for (i, kind) in self.stage_order.iter().enumerate() {
            if self.stage_order[..i].contains(kind) {
                return Err(SignatureError::InvalidConfig(format!(
                    "stage {:?} listed more than once in stage_order",
                    kind
                )));
            }
        }

        Ok(())
    }

    /// Whether a stage takes part in a run
    pub fn is_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::FeatureScaling => self.enable_feature_scaling,
            StageKind::Amplification => self.amplification_factor != 1.0,
            StageKind::PcaWhitening => self.enable_pca_whitening,
        }
    }

    /// Enabled stages in execution order
    pub fn enabled_stages(&self) -> Vec<StageKind> {
        self.stage_order
            .iter()
            .copied()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Configuration with every stage switched off
    pub fn disabled() -> Self {
        Self {
            amplification_factor: 1.0,
            enable_pca_whitening: false,
            enable_feature_scaling: false,
            enable_threshold_recompute: false,
            ..Self::default()
        }
    }
}
