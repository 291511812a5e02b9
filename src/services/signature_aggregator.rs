/// Signature Aggregation Service
///
/// Reduces the accepted, normalized samples of one session to a signature:
/// - Element-wise mean vector
/// - Per-sample distances to the mean and their distribution
/// - Acceptance threshold = percentile(distances) * margin

use ndarray::{Array1, Array2, Axis};
use ndarray_stats::{interpolate::Linear, Quantile1dExt};
use noisy_float::types::{n64, N64};
use statrs::statistics::Statistics;

use crate::config::TrainerConfig;
use crate::error::{Result, SignatureError};
use crate::models::pose::{euclidean_distance, NormalizedPose};
use crate::models::signature::SignatureStatistics;

/// Aggregated statistics for one gesture session
#[derive(Debug, Clone)]
pub struct SignatureAggregate {
    pub mean_vector: Array1<f64>,
    pub distances: Vec<f64>,
    pub sigma: f64,
    pub threshold_base: f64,
    pub threshold: f64,
    pub statistics: SignatureStatistics,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SignatureAggregator {
    min_samples: usize,
    percentile: f64,
    margin: f64,
    max_recommended_threshold: f64,
    stability_threshold: f64,
}

impl SignatureAggregator {
    pub fn new(config: &TrainerConfig) -> Self {
        Self {
            min_samples: config.min_stable_frames,
            percentile: config.threshold_percentile,
            margin: config.threshold_margin,
            max_recommended_threshold: config.max_recommended_threshold,
            stability_threshold: config.stability_threshold,
        }
    }

    /// Aggregate samples into mean vector, dispersion statistics and threshold
    pub fn aggregate(&self, samples: &[NormalizedPose]) -> Result<SignatureAggregate> {
        if samples.is_empty() || samples.len() < self.min_samples {
            return Err(SignatureError::InsufficientSamples {
                accepted: samples.len(),
                required: self.min_samples.max(1),
                stability_threshold: self.stability_threshold,
            });
        }

        let dim = samples[0].values().len();
        if let Some(bad) = samples.iter().find(|s| s.values().len() != dim) {
            return Err(SignatureError::DimensionMismatch {
                name: "training sample".to_string(),
                expected: dim,
                found: bad.values().len(),
            });
        }

        let matrix = Array2::from_shape_fn((samples.len(), dim), |(i, j)| samples[i].values()[j]);
        let mean_vector = matrix
            .mean_axis(Axis(0))
            .ok_or_else(|| SignatureError::Numeric("cannot average zero samples".to_string()))?;

        let distances = samples
            .iter()
            .map(|s| euclidean_distance(s.values(), &mean_vector))
            .collect::<Result<Vec<f64>>>()?;

        let sigma = Statistics::mean(&distances);
        let threshold_base = percentile(&distances, self.percentile)?;
        let threshold = threshold_base * self.margin;

        let scales: Vec<f64> = samples.iter().map(|s| s.scale()).collect();
        let statistics = SignatureStatistics {
            mean_distance: sigma,
            max_distance: Statistics::max(&distances),
            min_distance: Statistics::min(&distances),
            percentile_95: threshold_base,
            mean_original_scale: Statistics::mean(&scales),
        };

        let mut warnings = Vec::new();
        if threshold > self.max_recommended_threshold {
            let warning = format!(
                "Threshold {:.4} exceeds {:.2}; consider re-recording the gesture",
                threshold, self.max_recommended_threshold
            );
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        tracing::debug!(
            "Aggregated {} samples: sigma={:.4}, p{}={:.4}, threshold={:.4}",
            samples.len(),
            sigma,
            self.percentile,
            threshold_base,
            threshold
        );

        Ok(SignatureAggregate {
            mean_vector,
            distances,
            sigma,
            threshold_base,
            threshold,
            statistics,
            warnings,
        })
    }
}

/// Percentile in [0, 100] with linear interpolation between order statistics
pub fn percentile(values: &[f64], percentile: f64) -> Result<f64> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(SignatureError::Numeric(format!(
            "cannot take a percentile of non-finite value {}",
            bad
        )));
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(SignatureError::Numeric(format!(
            "percentile {} outside [0, 100]",
            percentile
        )));
    }

    let mut data: Array1<N64> = values.iter().map(|v| n64(*v)).collect();
    data.quantile_mut(n64(percentile / 100.0), &Linear)
        .map(|value| value.raw())
        .map_err(|e| SignatureError::Numeric(format!("{:?}", e)))
}
