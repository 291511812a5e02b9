/// Signature Trainer
///
/// Runs one recording session through the pipeline:
/// frame source -> landmark detector -> pose extraction -> stability filter
/// -> signature aggregation. Produces one signature per session or fails
/// without producing anything.

use chrono::Utc;
use serde_json::Map;

use crate::config::{DegeneratePolicy, TrainerConfig};
use crate::error::Result;
use crate::models::pose::{NormalizedPose, RawPose};
use crate::models::report::TrainingReport;
use crate::models::signature::{
    GestureSignature, SignatureMetadata, SIGNATURE_ALGORITHM, SIGNATURE_KIND_UNIMANUAL,
};
use crate::services::frame_source::{
    DisplayControl, DisplaySink, FrameSource, FrameStatus, LandmarkDetector,
};
use crate::services::pose_extraction::PoseExtractor;
use crate::services::signature_aggregator::SignatureAggregator;
use crate::services::stability_filter::{StabilityDecision, StabilityFilter};

/// Result of a successful training session
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub signature: GestureSignature,
    pub report: TrainingReport,
    /// Raw poses of the accepted samples, for diagnostics
    pub raw_samples: Vec<RawPose>,
}

#[derive(Debug)]
pub struct SignatureTrainer {
    config: TrainerConfig,
    extractor: PoseExtractor,
    aggregator: SignatureAggregator,
}

impl SignatureTrainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;

        let extractor = PoseExtractor::with_landmark_count(config.num_landmarks);
        let aggregator = SignatureAggregator::new(&config);

        Ok(Self {
            config,
            extractor,
            aggregator,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train a signature for `gesture_name` from every frame the source yields
    pub fn train<S, D, V>(
        &self,
        gesture_name: &str,
        source: &mut S,
        detector: &mut D,
        display: &mut V,
    ) -> Result<TrainingOutcome>
    where
        S: FrameSource,
        D: LandmarkDetector<S::Frame>,
        V: DisplaySink,
    {
        tracing::info!(
            "Training gesture '{}' (dim {}, stability threshold {}, min frames {})",
            gesture_name,
            self.extractor.pose_dim(),
            self.config.stability_threshold,
            self.config.min_stable_frames
        );

        let mut filter = StabilityFilter::new(self.config.stability_threshold);
        let mut report = TrainingReport::default();
        let mut raw_samples: Vec<RawPose> = Vec::new();
        let mut samples: Vec<NormalizedPose> = Vec::new();

        while let Some(frame) = source.next_frame()? {
            report.total_frames += 1;

            let status = match detector.detect(&frame)? {
                None => FrameStatus::NoHand,
                Some(keypoints) => {
                    report.frames_with_hand += 1;
                    let (raw, normalized) = self.extractor.extract_normalized(&keypoints)?;

                    match filter.observe(&raw)? {
                        StabilityDecision::FirstFrame => FrameStatus::FirstFrame,
                        StabilityDecision::Moving { delta } => FrameStatus::Moving { delta },
                        StabilityDecision::Stable { .. } => {
                            self.accept_sample(
                                raw,
                                normalized,
                                &mut report,
                                &mut raw_samples,
                                &mut samples,
                            );
                            FrameStatus::Stable {
                                count: samples.len(),
                            }
                        }
                    }
                }
            };

            if display.show(report.total_frames, &status) == DisplayControl::Stop {
                tracing::info!("Training stopped at frame {}", report.total_frames);
                report.stopped_early = true;
                break;
            }
        }

        report.stable_frames = samples.len();
        tracing::info!(
            "Stable frames: {} / {} total ({} with a hand)",
            report.stable_frames,
            report.total_frames,
            report.frames_with_hand
        );

        let aggregate = self.aggregator.aggregate(&samples)?;
        report.warnings.extend(aggregate.warnings.iter().cloned());

        let metadata = SignatureMetadata {
            stable_frames: Some(samples.len()),
            total_frames: Some(report.total_frames),
            trained_at: Some(Utc::now()),
            num_landmarks: Some(self.config.num_landmarks),
            ..SignatureMetadata::default()
        };

        let signature = GestureSignature {
            name: gesture_name.to_string(),
            kind: SIGNATURE_KIND_UNIMANUAL.to_string(),
            dimension: self.extractor.pose_dim(),
            mean_vector: aggregate.mean_vector.to_vec(),
            sigma: aggregate.sigma,
            threshold: aggregate.threshold,
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            statistics: aggregate.statistics,
            metadata,
            extra: Map::new(),
        };

        tracing::info!(
            "Trained '{}': sigma={:.4}, threshold={:.4}",
            signature.name,
            signature.sigma,
            signature.threshold
        );

        Ok(TrainingOutcome {
            signature,
            report,
            raw_samples,
        })
    }

    fn accept_sample(
        &self,
        raw: RawPose,
        normalized: NormalizedPose,
        report: &mut TrainingReport,
        raw_samples: &mut Vec<RawPose>,
        samples: &mut Vec<NormalizedPose>,
    ) {
        if normalized.is_degenerate() {
            report.degenerate_frames += 1;
            match self.config.degenerate_policy {
                DegeneratePolicy::Skip => {
                    tracing::debug!("Skipping degenerate stable frame {}", report.total_frames);
                    return;
                }
                DegeneratePolicy::Keep => {
                    let warning = format!(
                        "Degenerate pose at frame {} kept in aggregation",
                        report.total_frames
                    );
                    tracing::warn!("{}", warning);
                    report.warnings.push(warning);
                }
            }
        }

        raw_samples.push(raw);
        samples.push(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::error::SignatureError;
    use crate::models::pose::Landmark;
    use crate::services::frame_source::{
        HeadlessDisplay, MemoryFrameSource, RecordedFrame, RecordedLandmarkDetector,
    };

    fn hand(offset: f32) -> RecordedFrame {
        let landmarks = (0..21)
            .map(|i| Landmark::new(0.3 + i as f32 * 0.01 + offset, 0.5 + (i % 5) as f32 * 0.02))
            .collect();
        RecordedFrame::with_landmarks(landmarks)
    }

    fn flat_hand() -> RecordedFrame {
        RecordedFrame::with_landmarks(vec![Landmark::new(0.5, 0.5); 21])
    }

    fn trainer(min_frames: usize) -> SignatureTrainer {
        SignatureTrainer::new(TrainerConfig {
            min_stable_frames: min_frames,
            ..TrainerConfig::default()
        })
        .unwrap()
    }

    struct StopAfter(usize);

    impl DisplaySink for StopAfter {
        fn show(&mut self, frame_number: usize, _status: &FrameStatus) -> DisplayControl {
            if frame_number >= self.0 {
                DisplayControl::Stop
            } else {
                DisplayControl::Continue
            }
        }
    }

    #[test]
    fn test_train_stable_session() {
        let mut frames = vec![RecordedFrame::no_hand()];
        frames.extend((0..8).map(|i| hand(i as f32 * 0.001)));
        let mut source = MemoryFrameSource::new(frames);

        let outcome = trainer(5)
            .train(
                "hola",
                &mut source,
                &mut RecordedLandmarkDetector::default(),
                &mut HeadlessDisplay,
            )
            .unwrap();

        // first hand frame has no predecessor
        assert_eq!(outcome.report.total_frames, 9);
        assert_eq!(outcome.report.frames_with_hand, 8);
        assert_eq!(outcome.report.stable_frames, 7);
        assert_eq!(outcome.raw_samples.len(), 7);

        let sig = outcome.signature;
        assert_eq!(sig.name, "hola");
        assert_eq!(sig.dimension, 42);
        assert_eq!(sig.mean_vector.len(), 42);
        assert_eq!(sig.metadata.stable_frames, Some(7));
        assert_eq!(sig.metadata.total_frames, Some(9));
        assert_eq!(sig.metadata.num_landmarks, Some(21));
        assert!(sig.metadata.trained_at.is_some());
        assert!(!sig.metadata.optimized);
        assert!(sig.threshold >= 0.0);
    }

    #[test]
    fn test_moving_frames_are_rejected() {
        let frames = (0..10).map(|i| hand(i as f32 * 0.05)).collect();
        let mut source = MemoryFrameSource::new(frames);

        let result = trainer(5).train(
            "rapido",
            &mut source,
            &mut RecordedLandmarkDetector::default(),
            &mut HeadlessDisplay,
        );

        assert_matches!(
            result,
            Err(SignatureError::InsufficientSamples { accepted: 0, required: 5, .. })
        );
    }

    #[test]
    fn test_four_stable_frames_below_minimum_fail() {
        let frames = (0..5).map(|_| hand(0.0)).collect();
        let mut source = MemoryFrameSource::new(frames);

        let result = trainer(5).train(
            "corto",
            &mut source,
            &mut RecordedLandmarkDetector::default(),
            &mut HeadlessDisplay,
        );

        assert_matches!(
            result,
            Err(SignatureError::InsufficientSamples { accepted: 4, required: 5, .. })
        );
    }

    #[test]
    fn test_degenerate_policy() {
        let frames: Vec<RecordedFrame> = (0..4).map(|_| flat_hand()).collect();

        let keep = trainer(3)
            .train(
                "plano",
                &mut MemoryFrameSource::new(frames.clone()),
                &mut RecordedLandmarkDetector::default(),
                &mut HeadlessDisplay,
            )
            .unwrap();
        assert_eq!(keep.report.degenerate_frames, 3);
        assert_eq!(keep.report.stable_frames, 3);
        assert!(!keep.report.warnings.is_empty());
        assert_eq!(keep.signature.statistics.mean_original_scale, 0.0);

        let skipping = SignatureTrainer::new(TrainerConfig {
            min_stable_frames: 3,
            degenerate_policy: DegeneratePolicy::Skip,
            ..TrainerConfig::default()
        })
        .unwrap();
        let result = skipping.train(
            "plano",
            &mut MemoryFrameSource::new(frames),
            &mut RecordedLandmarkDetector::default(),
            &mut HeadlessDisplay,
        );
        assert_matches!(
            result,
            Err(SignatureError::InsufficientSamples { accepted: 0, .. })
        );
    }

    #[test]
    fn test_display_can_stop_early() {
        let frames = (0..20).map(|_| hand(0.0)).collect();
        let mut source = MemoryFrameSource::new(frames);

        let outcome = trainer(3)
            .train(
                "parar",
                &mut source,
                &mut RecordedLandmarkDetector::default(),
                &mut StopAfter(6),
            )
            .unwrap();

        assert!(outcome.report.stopped_early);
        assert_eq!(outcome.report.total_frames, 6);
        assert_eq!(outcome.report.stable_frames, 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SignatureTrainer::new(TrainerConfig {
            stability_threshold: -1.0,
            ..TrainerConfig::default()
        });
        assert_matches!(result, Err(SignatureError::InvalidConfig(_)));
    }
}
