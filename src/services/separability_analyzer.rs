/// Separability Analysis Service
///
/// Read-only diagnostics over a signature set:
/// - Pairwise Euclidean distances between mean vectors (upper triangle)
/// - Min / mean / max / standard deviation of those distances
/// - Qualitative verdict from the minimum distance
///
/// Every record must share one dimension; a mixed set is rejected before any
/// distance is measured.

use statrs::statistics::Statistics;

use crate::error::Result;
use crate::models::pose::euclidean_distance;
use crate::models::report::{
    DistanceSummary, PairDistance, SeparabilityComparison, SeparabilityReport,
    SeparabilityVerdict,
};
use crate::models::signature::SignatureSet;

#[derive(Debug, Default, Clone, Copy)]
pub struct SeparabilityAnalyzer;

impl SeparabilityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, signatures: &SignatureSet) -> Result<SeparabilityReport> {
        if !signatures.is_empty() {
            signatures.validate_dimensions()?;
        }

        let records: Vec<_> = signatures.iter().collect();
        let names = records.iter().map(|s| s.name.clone()).collect();

        let mut pairs = Vec::new();
        for (i, first) in records.iter().enumerate() {
            let a = first.mean_array();
            for second in &records[i + 1..] {
                pairs.push(PairDistance {
                    first: first.name.clone(),
                    second: second.name.clone(),
                    distance: euclidean_distance(&a, &second.mean_array())?,
                });
            }
        }

        let summary = summarize(&pairs);
        let verdict = summary.map(|s| SeparabilityVerdict::from_min_distance(s.min));

        match (&summary, verdict) {
            (Some(summary), Some(SeparabilityVerdict::Poor)) => tracing::warn!(
                "Poor separability: minimum distance {:.4}. {}",
                summary.min,
                SeparabilityVerdict::Poor.recommendation()
            ),
            (Some(summary), Some(verdict)) => tracing::info!(
                "Separability {}: min={:.4} mean={:.4} max={:.4}",
                verdict,
                summary.min,
                summary.mean,
                summary.max
            ),
            _ => tracing::debug!("Fewer than two signatures; no pairwise distances"),
        }

        Ok(SeparabilityReport {
            names,
            pairs,
            summary,
            verdict,
        })
    }

    /// Analyze the same gestures before and after optimization
    pub fn compare(
        &self,
        before: &SignatureSet,
        after: &SignatureSet,
    ) -> Result<SeparabilityComparison> {
        Ok(SeparabilityComparison {
            before: self.analyze(before)?,
            after: self.analyze(after)?,
        })
    }
}

fn summarize(pairs: &[PairDistance]) -> Option<DistanceSummary> {
    if pairs.is_empty() {
        return None;
    }

    let distances: Vec<f64> = pairs.iter().map(|p| p.distance).collect();
    Some(DistanceSummary {
        min: Statistics::min(&distances),
        mean: Statistics::mean(&distances),
        max: Statistics::max(&distances),
        std_dev: Statistics::population_std_dev(&distances),
    })
}
