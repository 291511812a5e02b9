use anyhow::{Context, Result};
use clap::Args;
use gesture_signatures::config::{DegeneratePolicy, TrainerConfig};
use gesture_signatures::services::{
    DisplaySink, KeypointFileSource, LogDisplay, RecordedLandmarkDetector, SignatureTrainer,
    TrainingOutcome,
};
use std::path::PathBuf;

use crate::config::Config;
use crate::storage::SignatureStore;
use crate::ui::{self, ProgressDisplay};

#[derive(Args)]
pub struct TrainCommand {
    /// Gesture name (unique within a signature directory)
    name: String,

    /// Recorded landmarks, one JSON frame per line
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory (defaults to storage.gestures_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum raw-frame delta for a stable frame
    #[arg(long)]
    stability_threshold: Option<f64>,

    /// Minimum stable frames required
    #[arg(long)]
    min_frames: Option<usize>,

    /// Drop degenerate (near-zero norm) samples before aggregation
    #[arg(long)]
    skip_degenerate: bool,

    /// Hide live frame feedback
    #[arg(long)]
    no_progress: bool,
}

impl TrainCommand {
    fn trainer_config(&self, base: &TrainerConfig) -> TrainerConfig {
        let mut config = base.clone();
        if let Some(threshold) = self.stability_threshold {
            config.stability_threshold = threshold;
        }
        if let Some(min_frames) = self.min_frames {
            config.min_stable_frames = min_frames;
        }
        if self.skip_degenerate {
            config.degenerate_policy = DegeneratePolicy::Skip;
        }
        config
    }

    pub fn execute(self, config: &Config) -> Result<()> {
        let trainer_config = self.trainer_config(&config.trainer);
        let trainer = SignatureTrainer::new(trainer_config).context("Invalid trainer settings")?;

        // per-frame status goes to the debug log when the spinner is off
        let outcome = if self.no_progress {
            self.run(&trainer, &mut LogDisplay)
        } else {
            let mut display = ProgressDisplay::new();
            let outcome = self.run(&trainer, &mut display);
            display.finish();
            outcome
        }?;

        let store = SignatureStore::new(
            self.output
                .clone()
                .unwrap_or_else(|| config.storage.gestures_dir.clone()),
        );
        let path = store.save_trained(&outcome.signature)?;

        ui::print_training_summary(&outcome.signature, &outcome.report);
        println!();
        println!("Saved to {}", path.display());

        Ok(())
    }

    fn run<V: DisplaySink>(
        &self,
        trainer: &SignatureTrainer,
        display: &mut V,
    ) -> Result<TrainingOutcome> {
        // the source owns the file handle and releases it on every return path
        let mut source = KeypointFileSource::open(&self.input)
            .with_context(|| format!("Cannot open recording {:?}", self.input))?;
        let settings = trainer.config();
        let mut detector = RecordedLandmarkDetector::new(
            settings.min_detection_confidence,
            settings.min_tracking_confidence,
        );

        trainer
            .train(&self.name, &mut source, &mut detector, display)
            .with_context(|| format!("Training failed for gesture '{}'; no file written", self.name))
    }
}
