// Terminal output: live training feedback and report printing

use colored::Colorize;
use gesture_signatures::models::{
    GestureSignature, SeparabilityComparison, SeparabilityReport, SeparabilityVerdict,
    TrainingReport,
};
use gesture_signatures::services::{DisplayControl, DisplaySink, FrameStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner showing the per-frame stability status while training
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} [{pos}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for ProgressDisplay {
    fn show(&mut self, frame_number: usize, status: &FrameStatus) -> DisplayControl {
        self.bar.set_position(frame_number as u64);
        let message = match status {
            FrameStatus::NoHand => "no hand".to_string(),
            FrameStatus::FirstFrame => "hand detected".to_string(),
            FrameStatus::Stable { count } => format!("STABLE ({})", count),
            FrameStatus::Moving { delta } => format!("MOVING (delta={:.3})", delta),
        };
        self.bar.set_message(message);
        DisplayControl::Continue
    }
}

fn verdict_label(verdict: SeparabilityVerdict) -> colored::ColoredString {
    let label = verdict.to_string().to_uppercase();
    match verdict {
        SeparabilityVerdict::Poor => label.red().bold(),
        SeparabilityVerdict::Moderate => label.yellow().bold(),
        SeparabilityVerdict::Good => label.green().bold(),
    }
}

pub fn print_training_summary(signature: &GestureSignature, report: &TrainingReport) {
    println!("{} Trained gesture '{}'", "✓".green(), signature.name.bold());
    println!("────────────────────────────────");
    println!("  Frames:        {}", report.total_frames);
    println!("  With hand:     {}", report.frames_with_hand);
    println!("  Stable:        {}", report.stable_frames);
    if report.degenerate_frames > 0 {
        println!("  Degenerate:    {}", report.degenerate_frames);
    }
    if report.stopped_early {
        println!("  Stopped early: yes");
    }
    println!("  Dimension:     {}", signature.dimension);
    println!("  Sigma:         {:.4}", signature.sigma);
    println!("  Threshold:     {:.4}", signature.threshold);

    for warning in &report.warnings {
        println!("{} {}", "!".yellow(), warning);
    }
}

pub fn print_report(title: &str, report: &SeparabilityReport) {
    println!("{}", title.bold());
    println!("────────────────────────────────");

    for pair in &report.pairs {
        println!("  {} <-> {}: {:.4}", pair.first, pair.second, pair.distance);
    }

    match (&report.summary, report.verdict) {
        (Some(summary), Some(verdict)) => {
            println!();
            println!(
                "  min {:.4}  mean {:.4}  max {:.4}  std {:.4}",
                summary.min, summary.mean, summary.max, summary.std_dev
            );
            if let Some(pair) = report.closest_pair() {
                println!("  closest: {} <-> {}", pair.first, pair.second);
            }
            println!("  separability: {}", verdict_label(verdict));
            println!("  {}", verdict.recommendation());
        }
        _ => println!("  Fewer than two gestures; nothing to compare"),
    }
    println!();
}

pub fn print_comparison(comparison: &SeparabilityComparison) {
    print_report("Before optimization", &comparison.before);
    print_report("After optimization", &comparison.after);

    if let Some(change) = comparison.min_distance_change() {
        let formatted = format!("{:+.4}", change);
        let formatted = if comparison.improved() {
            formatted.green()
        } else {
            formatted.red()
        };
        println!("Minimum distance change: {}", formatted);
    }
}
