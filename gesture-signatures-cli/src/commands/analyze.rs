use anyhow::{Context, Result};
use clap::Args;
use gesture_signatures::services::SeparabilityAnalyzer;
use std::path::PathBuf;

use crate::config::Config;
use crate::storage::SignatureStore;
use crate::ui;

#[derive(Args)]
pub struct AnalyzeCommand {
    /// Directory of signatures (defaults to storage.gestures_dir)
    dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl AnalyzeCommand {
    pub fn execute(self, config: &Config) -> Result<()> {
        let dir = self
            .dir
            .unwrap_or_else(|| config.storage.gestures_dir.clone());
        let signatures = SignatureStore::new(&dir).load_all()?;
        let report = SeparabilityAnalyzer::new()
            .analyze(&signatures)
            .with_context(|| format!("Cannot analyze signatures in {}", dir.display()))?;

        if self.json {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        } else {
            ui::print_report(&format!("Separability of {}", dir.display()), &report);
        }

        Ok(())
    }
}
