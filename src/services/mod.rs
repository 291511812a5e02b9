// Training and optimization services

pub mod frame_source;
pub mod optimization_stages;
pub mod pose_extraction;
pub mod separability_analyzer;
pub mod signature_aggregator;
pub mod signature_optimizer;
pub mod signature_trainer;
pub mod stability_filter;

pub use frame_source::{
    DisplayControl, DisplaySink, FrameSource, FrameStatus, HeadlessDisplay, KeypointFileSource,
    LandmarkDetector, LogDisplay, MemoryFrameSource, RecordedFrame, RecordedLandmarkDetector,
};
pub use optimization_stages::{
    CentroidAmplification, FeatureImportanceScaling, OptimizationStage, PcaWhitening,
    StageOutcome, ThresholdRecomputation,
};
pub use pose_extraction::PoseExtractor;
pub use separability_analyzer::SeparabilityAnalyzer;
pub use signature_aggregator::{SignatureAggregate, SignatureAggregator};
pub use signature_optimizer::{OptimizationOutcome, SignatureOptimizer};
pub use signature_trainer::{SignatureTrainer, TrainingOutcome};
pub use stability_filter::{StabilityDecision, StabilityFilter};
