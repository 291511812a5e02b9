/// Vector-space optimization stages
///
/// Every stage is a whole-set transform `SignatureSet -> SignatureSet` over the
/// mean vectors only; all other record fields are copied unchanged. Stages:
/// - Feature-importance scaling (between-gesture variance weights)
/// - Centroid-deviation amplification with [0, 1] clipping
/// - PCA whitening followed by per-column min-max normalization
///
/// Threshold recomputation runs after the vector stages and only touches
/// thresholds.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use ndarray_stats::QuantileExt;

use crate::config::{OptimizerConfig, StageKind};
use crate::error::{Result, SignatureError};
use crate::models::signature::SignatureSet;

/// Maxima and ranges below this are treated as zero
const ZERO_EPSILON: f64 = 1e-12;

/// Output of one stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub signatures: SignatureSet,
    pub warnings: Vec<String>,
}

impl StageOutcome {
    fn new(signatures: SignatureSet) -> Self {
        Self {
            signatures,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: String) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

pub trait OptimizationStage {
    fn kind(&self) -> StageKind;

    /// Tag recorded in the metadata of optimized signatures
    fn technique(&self) -> String;

    fn apply(&self, signatures: &SignatureSet) -> Result<StageOutcome>;
}

/// Build the stage for `kind` from the optimizer configuration
pub fn build_stage(kind: StageKind, config: &OptimizerConfig) -> Box<dyn OptimizationStage> {
    match kind {
        StageKind::FeatureScaling => Box::new(FeatureImportanceScaling),
        StageKind::Amplification => {
            Box::new(CentroidAmplification::new(config.amplification_factor))
        }
        StageKind::PcaWhitening => Box::new(PcaWhitening::new(config.eigenvalue_floor)),
    }
}

fn ensure_finite(matrix: &Array2<f64>) -> Result<()> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(SignatureError::Numeric(
            "mean vectors contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn column_mean(matrix: &Array2<f64>) -> Result<Array1<f64>> {
    matrix
        .mean_axis(Axis(0))
        .ok_or(SignatureError::EmptySignatureSet)
}

/// Weights features by how much they vary across gestures
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureImportanceScaling;

impl FeatureImportanceScaling {
    /// weight[j] = 1 + var_j / mean(var); all ones when every variance is zero
    pub fn weights(matrix: &Array2<f64>) -> Array1<f64> {
        let variance = matrix.var_axis(Axis(0), 0.0);
        let mean_variance = variance.mean().unwrap_or(0.0);

        if mean_variance <= ZERO_EPSILON {
            return Array1::ones(variance.len());
        }

        variance.mapv(|v| 1.0 + v / mean_variance)
    }
}

impl OptimizationStage for FeatureImportanceScaling {
    fn kind(&self) -> StageKind {
        StageKind::FeatureScaling
    }

    fn technique(&self) -> String {
        "feature_importance_scaling".to_string()
    }

    fn apply(&self, signatures: &SignatureSet) -> Result<StageOutcome> {
        let matrix = signatures.mean_matrix()?;
        ensure_finite(&matrix)?;

        let weights = Self::weights(&matrix);
        let mut scaled = &matrix * &weights;
        let names = signatures.names();
        let mut degenerate = Vec::new();

        for (name, mut row) in names.iter().zip(scaled.rows_mut()) {
            let max = *row
                .max()
                .map_err(|e| SignatureError::Numeric(format!("{:?}", e)))?;

            if max.abs() <= ZERO_EPSILON {
                degenerate.push(name.clone());
                continue;
            }
            row /= max;
        }

        let mut outcome = StageOutcome::new(signatures.with_mean_matrix(&scaled)?);
        for name in degenerate {
            outcome.warn(format!(
                "Signature '{}' has a zero maximum after feature weighting; left unscaled",
                name
            ));
        }

        tracing::debug!(
            "Feature weights range {:.3}..{:.3}",
            weights.min().map_or(f64::NAN, |v| *v),
            weights.max().map_or(f64::NAN, |v| *v)
        );
        Ok(outcome)
    }
}

/// Pushes every signature away from the population centroid
#[derive(Debug, Clone, Copy)]
pub struct CentroidAmplification {
    factor: f64,
}

impl CentroidAmplification {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl OptimizationStage for CentroidAmplification {
    fn kind(&self) -> StageKind {
        StageKind::Amplification
    }

    fn technique(&self) -> String {
        format!("amplification_{:?}x", self.factor)
    }

    fn apply(&self, signatures: &SignatureSet) -> Result<StageOutcome> {
        let matrix = signatures.mean_matrix()?;
        ensure_finite(&matrix)?;

        let centroid = column_mean(&matrix)?;
        let deviation = &matrix - &centroid;
        let amplified = (deviation * self.factor + &centroid).mapv(|v| v.clamp(0.0, 1.0));

        Ok(StageOutcome::new(signatures.with_mean_matrix(&amplified)?))
    }
}

/// Decorrelates features and equalizes variance along principal directions
#[derive(Debug, Clone, Copy)]
pub struct PcaWhitening {
    eigenvalue_floor: f64,
}

impl PcaWhitening {
    pub fn new(eigenvalue_floor: f64) -> Self {
        Self { eigenvalue_floor }
    }

    /// Unbiased covariance of the centered rows; zero with fewer than two rows
    pub fn covariance(centered: &Array2<f64>) -> Array2<f64> {
        let n = centered.nrows();
        let d = centered.ncols();
        if n < 2 {
            return Array2::zeros((d, d));
        }
        centered.t().dot(centered) / (n - 1) as f64
    }

    /// W = V diag(1 / sqrt(max(lambda, floor))) V^T
    pub fn whitening_matrix(&self, covariance: &Array2<f64>) -> Array2<f64> {
        let d = covariance.nrows();
        let cov = DMatrix::from_fn(d, d, |i, j| covariance[[i, j]]);
        let eigen = SymmetricEigen::new(cov);

        let floor = self.eigenvalue_floor;
        let inv_sqrt = eigen.eigenvalues.map(|lambda| 1.0 / lambda.max(floor).sqrt());
        let w = &eigen.eigenvectors
            * DMatrix::from_diagonal(&inv_sqrt)
            * eigen.eigenvectors.transpose();

        Array2::from_shape_fn((d, d), |(i, j)| w[(i, j)])
    }
}

/// Rescale every column independently to [0, 1]; constant columns map to 0
pub fn min_max_columns(matrix: &Array2<f64>) -> Array2<f64> {
    let mut normalized = matrix.clone();
    for mut column in normalized.columns_mut() {
        let min = column.fold(f64::INFINITY, |acc, v| acc.min(*v));
        let max = column.fold(f64::NEG_INFINITY, |acc, v| acc.max(*v));
        let range = max - min;
        let range = if range <= ZERO_EPSILON { 1.0 } else { range };
        column.mapv_inplace(|v| (v - min) / range);
    }
    normalized
}

impl OptimizationStage for PcaWhitening {
    fn kind(&self) -> StageKind {
        StageKind::PcaWhitening
    }

    fn technique(&self) -> String {
        "PCA_whitening".to_string()
    }

    fn apply(&self, signatures: &SignatureSet) -> Result<StageOutcome> {
        let matrix = signatures.mean_matrix()?;
        ensure_finite(&matrix)?;

        let mean = column_mean(&matrix)?;
        let centered = &matrix - &mean;
        let covariance = Self::covariance(&centered);
        let whitening = self.whitening_matrix(&covariance);

        // population mean is restored after whitening
        let whitened = centered.dot(&whitening.t()) + &mean;
        let normalized = min_max_columns(&whitened);

        let mut outcome = StageOutcome::new(signatures.with_mean_matrix(&normalized)?);
        if signatures.len() < 2 {
            outcome.warn(format!(
                "Whitening {} signature(s): covariance is degenerate, eigenvalue floor applied",
                signatures.len()
            ));
        }
        Ok(outcome)
    }
}

/// Analytic threshold estimate for optimized signatures.
///
/// The optimized space has no frame-level samples to take a percentile
/// from, so the threshold is approximated as three standard deviations of
/// isotropic noise in D dimensions: `3 * sigma * sqrt(D)`, times a safety
/// margin. This is an approximation, not an empirical percentile.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdRecomputation {
    margin: f64,
}

impl ThresholdRecomputation {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    pub fn estimated_threshold(sigma: f64, dimension: usize) -> f64 {
        3.0 * sigma * (dimension as f64).sqrt()
    }

    pub fn adjusted_threshold(&self, sigma: f64, dimension: usize) -> f64 {
        Self::estimated_threshold(sigma, dimension) * self.margin
    }

    pub fn apply(&self, signatures: &SignatureSet) -> SignatureSet {
        signatures.map_signatures(|signature| {
            let mut updated = signature.clone();
            updated.threshold = self.adjusted_threshold(signature.sigma, signature.mean_vector.len());
            tracing::debug!(
                "Threshold for '{}': {:.4} -> {:.4}",
                signature.name,
                signature.threshold,
                updated.threshold
            );
            updated
        })
    }
}
