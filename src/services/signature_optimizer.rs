/// Signature Optimizer
///
/// Runs the enabled vector-space stages over a whole signature set, in the
/// configured order, then recomputes thresholds and stamps optimization
/// metadata. The input set is never modified; on any error nothing is
/// produced.

use chrono::Utc;

use crate::config::{OptimizerConfig, StageKind};
use crate::error::Result;
use crate::models::signature::SignatureSet;
use crate::services::optimization_stages::{
    build_stage, OptimizationStage, ThresholdRecomputation,
};

/// Result of one optimization run
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub signatures: SignatureSet,
    /// Technique tags of the stages that ran, in execution order
    pub techniques_applied: Vec<String>,
    /// Coordinates pulled back into [0, 1] after the vector stages
    pub clipped_coordinates: usize,
    pub thresholds_recomputed: bool,
    pub warnings: Vec<String>,
}

pub struct SignatureOptimizer {
    config: OptimizerConfig,
    stages: Vec<Box<dyn OptimizationStage>>,
    thresholds: Option<ThresholdRecomputation>,
}

impl SignatureOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;

        let stages = config
            .enabled_stages()
            .into_iter()
            .map(|kind| build_stage(kind, &config))
            .collect();
        let thresholds = config
            .enable_threshold_recompute
            .then(|| ThresholdRecomputation::new(config.threshold_margin));

        Ok(Self {
            config,
            stages,
            thresholds,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Stages that will run, in order
    pub fn stages(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind()).collect()
    }

    pub fn optimize(&self, input: &SignatureSet) -> Result<OptimizationOutcome> {
        // every record must agree on the dimension before anything runs
        let dimension = input.validate_dimensions()?;

        tracing::info!(
            "Optimizing {} signatures (dim {}) with stages {:?}",
            input.len(),
            dimension,
            self.stages()
        );

        let mut working = input.clone();
        let mut techniques_applied = Vec::with_capacity(self.stages.len());
        let mut warnings = Vec::new();

        for stage in &self.stages {
            let outcome = stage.apply(&working)?;
            tracing::debug!("Stage {:?} complete", stage.kind());

            working = outcome.signatures;
            warnings.extend(outcome.warnings);
            techniques_applied.push(stage.technique());
        }

        let (working, clipped_coordinates) = clip_to_unit_range(&working)?;
        if clipped_coordinates > 0 {
            let warning = format!(
                "{} coordinates fell outside [0, 1] after optimization and were clipped",
                clipped_coordinates
            );
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        let working = match &self.thresholds {
            Some(recompute) => recompute.apply(&working),
            None => working,
        };

        let optimized_at = Utc::now();
        let signatures = working.map_signatures(|signature| {
            let mut updated = signature.clone();
            updated.metadata.optimized = true;
            updated.metadata.optimized_at = Some(optimized_at);
            updated.metadata.techniques = techniques_applied.clone();
            updated
        });

        tracing::info!(
            "Optimization complete: techniques {:?}, {} warning(s)",
            techniques_applied,
            warnings.len()
        );

        Ok(OptimizationOutcome {
            signatures,
            techniques_applied,
            clipped_coordinates,
            thresholds_recomputed: self.thresholds.is_some(),
            warnings,
        })
    }
}

fn clip_to_unit_range(signatures: &SignatureSet) -> Result<(SignatureSet, usize)> {
    let matrix = signatures.mean_matrix()?;
    let outside = matrix
        .iter()
        .filter(|v| !(0.0..=1.0).contains(*v))
        .count();

    if outside == 0 {
        return Ok((signatures.clone(), 0));
    }

    let clipped = matrix.mapv(|v| v.clamp(0.0, 1.0));
    Ok((signatures.with_mean_matrix(&clipped)?, outside))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::error::SignatureError;
    use crate::models::signature::{GestureSignature, SignatureMetadata, SignatureStatistics};
    use serde_json::{Map, Value};

    fn signature(name: &str, vector: Vec<f64>) -> GestureSignature {
        let mut extra = Map::new();
        extra.insert("camara".to_string(), Value::String("webcam".to_string()));
        GestureSignature {
            name: name.to_string(),
            kind: "unimanual".to_string(),
            dimension: vector.len(),
            mean_vector: vector,
            sigma: 0.01,
            threshold: 0.05,
            algorithm: "POSE_STATIC_FULLHAND_CENTERED_NORMALIZED".to_string(),
            statistics: SignatureStatistics::default(),
            metadata: SignatureMetadata {
                stable_frames: Some(30),
                extra,
                ..SignatureMetadata::default()
            },
            extra: Map::new(),
        }
    }

    fn sample_set() -> SignatureSet {
        SignatureSet::from_signatures(vec![
            signature("a", vec![0.1, 0.8, 0.3, 0.5]),
            signature("b", vec![0.6, 0.2, 0.4, 0.5]),
            signature("c", vec![0.3, 0.4, 0.9, 0.5]),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_pipeline() {
        let optimizer = SignatureOptimizer::new(OptimizerConfig::default()).unwrap();
        let outcome = optimizer.optimize(&sample_set()).unwrap();

        assert_eq!(
            outcome.techniques_applied,
            vec!["feature_importance_scaling", "amplification_1.5x", "PCA_whitening"]
        );
        assert!(outcome.thresholds_recomputed);

        for signature in outcome.signatures.iter() {
            assert_eq!(signature.mean_vector.len(), 4);
            assert!(signature.mean_vector.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!((signature.threshold - 3.0 * 0.01 * 2.0 * 1.2).abs() < 1e-12);
            assert!(signature.metadata.optimized);
            assert!(signature.metadata.optimized_at.is_some());
            assert_eq!(signature.metadata.techniques, outcome.techniques_applied);
            // provenance carried through
            assert_eq!(signature.metadata.stable_frames, Some(30));
            assert_eq!(signature.metadata.extra["camara"], "webcam");
        }
    }

    #[test]
    fn test_input_is_not_modified() {
        let input = sample_set();
        let before = input.clone();
        SignatureOptimizer::new(OptimizerConfig::default())
            .unwrap()
            .optimize(&input)
            .unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_stage_order_is_configurable() {
        let config = OptimizerConfig {
            stage_order: vec![StageKind::PcaWhitening, StageKind::FeatureScaling],
            ..OptimizerConfig::default()
        };
        let optimizer = SignatureOptimizer::new(config).unwrap();
        assert_eq!(
            optimizer.stages(),
            vec![StageKind::PcaWhitening, StageKind::FeatureScaling]
        );

        let outcome = optimizer.optimize(&sample_set()).unwrap();
        assert_eq!(
            outcome.techniques_applied,
            vec!["PCA_whitening", "feature_importance_scaling"]
        );
    }

    #[test]
    fn test_all_stages_disabled_keeps_vectors() {
        let input = sample_set();
        let outcome = SignatureOptimizer::new(OptimizerConfig::disabled())
            .unwrap()
            .optimize(&input)
            .unwrap();

        assert!(outcome.techniques_applied.is_empty());
        assert!(!outcome.thresholds_recomputed);
        for (before, after) in input.iter().zip(outcome.signatures.iter()) {
            assert_eq!(before.mean_vector, after.mean_vector);
            assert_eq!(before.threshold, after.threshold);
            assert!(after.metadata.optimized);
        }
    }

    #[test]
    fn test_dimension_mismatch_fails_before_any_stage() {
        let input = SignatureSet::from_signatures(vec![
            signature("a", vec![0.1, 0.2]),
            signature("b", vec![0.1, 0.2, 0.3]),
        ])
        .unwrap();

        let result = SignatureOptimizer::new(OptimizerConfig::default())
            .unwrap()
            .optimize(&input);
        assert_matches!(result, Err(SignatureError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_empty_set_rejected() {
        let result = SignatureOptimizer::new(OptimizerConfig::default())
            .unwrap()
            .optimize(&SignatureSet::new());
        assert_matches!(result, Err(SignatureError::EmptySignatureSet));
    }

    #[test]
    fn test_out_of_range_input_is_clipped() {
        // raw trainer output is centered, so it has negative coordinates
        let input = SignatureSet::from_signatures(vec![
            signature("a", vec![-0.4, 0.4]),
            signature("b", vec![0.3, -0.3]),
        ])
        .unwrap();
        let outcome = SignatureOptimizer::new(OptimizerConfig::disabled())
            .unwrap()
            .optimize(&input)
            .unwrap();

        assert_eq!(outcome.clipped_coordinates, 2);
        assert_eq!(outcome.signatures.get("a").unwrap().mean_vector, vec![0.0, 0.4]);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_single_signature_optimizes() {
        let input = SignatureSet::from_signatures(vec![signature("solo", vec![0.2, 0.7])]).unwrap();
        let outcome = SignatureOptimizer::new(OptimizerConfig::default())
            .unwrap()
            .optimize(&input)
            .unwrap();
        assert_eq!(outcome.signatures.len(), 1);
    }
}
