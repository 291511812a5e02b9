use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use gesture_signatures::config::{OptimizerConfig, StageKind};
use gesture_signatures::services::{SeparabilityAnalyzer, SignatureOptimizer};
use std::path::PathBuf;

use crate::config::Config;
use crate::storage::SignatureStore;
use crate::ui;

/// Optimization stage names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    FeatureScaling,
    Amplification,
    PcaWhitening,
}

impl From<StageArg> for StageKind {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::FeatureScaling => StageKind::FeatureScaling,
            StageArg::Amplification => StageKind::Amplification,
            StageArg::PcaWhitening => StageKind::PcaWhitening,
        }
    }
}

#[derive(Args)]
pub struct OptimizeCommand {
    /// Directory of trained signatures (defaults to storage.gestures_dir)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (defaults to storage.optimized_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Centroid-deviation multiplier; 1.0 disables amplification
    #[arg(short, long)]
    amplification: Option<f64>,

    /// Stage execution order
    #[arg(long, value_enum, value_delimiter = ',')]
    stages: Option<Vec<StageArg>>,

    /// Disable PCA whitening
    #[arg(long)]
    no_pca: bool,

    /// Disable feature-importance scaling
    #[arg(long)]
    no_feature_scaling: bool,

    /// Keep trained thresholds instead of recomputing them
    #[arg(long)]
    no_threshold_recompute: bool,

    /// Analyze only; do not write optimized records
    #[arg(long)]
    dry_run: bool,
}

impl OptimizeCommand {
    fn optimizer_config(&self, base: &OptimizerConfig) -> OptimizerConfig {
        let mut config = base.clone();
        if let Some(factor) = self.amplification {
            config.amplification_factor = factor;
        }
        if let Some(stages) = &self.stages {
            config.stage_order = stages.iter().copied().map(StageKind::from).collect();
        }
        if self.no_pca {
            config.enable_pca_whitening = false;
        }
        if self.no_feature_scaling {
            config.enable_feature_scaling = false;
        }
        if self.no_threshold_recompute {
            config.enable_threshold_recompute = false;
        }
        config
    }

    pub fn execute(self, config: &Config) -> Result<()> {
        let input = self
            .input
            .clone()
            .unwrap_or_else(|| config.storage.gestures_dir.clone());
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| config.storage.optimized_dir.clone());

        let optimizer = SignatureOptimizer::new(self.optimizer_config(&config.optimizer))
            .context("Invalid optimizer settings")?;

        let signatures = SignatureStore::new(&input).load_all()?;
        if signatures.is_empty() {
            bail!("No signature records found in {}", input.display());
        }
        println!("Loaded {} signatures from {}", signatures.len(), input.display());
        println!();

        let outcome = optimizer
            .optimize(&signatures)
            .context("Optimization failed; no files written")?;

        let comparison = SeparabilityAnalyzer::new()
            .compare(&signatures, &outcome.signatures)
            .context("Separability analysis failed")?;
        ui::print_comparison(&comparison);
        println!();

        if outcome.techniques_applied.is_empty() {
            println!("Techniques: none");
        } else {
            println!("Techniques: {}", outcome.techniques_applied.join(", "));
        }
        for warning in &outcome.warnings {
            println!("{} {}", "!".yellow(), warning);
        }

        if self.dry_run {
            println!("Dry run; nothing written");
            return Ok(());
        }

        let written = SignatureStore::new(&output).save_all(&outcome.signatures)?;
        println!(
            "{} Wrote {} optimized signatures to {}",
            "✓".green(),
            written.len(),
            output.display()
        );

        Ok(())
    }
}
