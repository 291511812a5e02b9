// Diagnostic reports for training runs and separability analysis

use ndarray::Array2;
use serde::Serialize;
use std::fmt;

/// Minimum pairwise distance below which separability is poor
pub const POOR_SEPARABILITY_BELOW: f64 = 0.15;

/// Minimum pairwise distance at or above which separability is good
pub const GOOD_SEPARABILITY_FROM: f64 = 0.25;

/// Qualitative separability of a signature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparabilityVerdict {
    Poor,
    Moderate,
    Good,
}

impl SeparabilityVerdict {
    /// Classify by minimum pairwise distance
    pub fn from_min_distance(min_distance: f64) -> Self {
        if min_distance < POOR_SEPARABILITY_BELOW {
            Self::Poor
        } else if min_distance < GOOD_SEPARABILITY_FROM {
            Self::Moderate
        } else {
            Self::Good
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Poor => "Increase the amplification factor or re-record the closest gestures",
            Self::Moderate => "Usable with temporal consensus in the matcher",
            Self::Good => "Gestures are well separated",
        }
    }
}

impl fmt::Display for SeparabilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Poor => "poor",
            Self::Moderate => "moderate",
            Self::Good => "good",
        };
        write!(f, "{}", label)
    }
}

/// Distance between two gestures (upper triangle entry)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDistance {
    pub first: String,
    pub second: String,
    pub distance: f64,
}

/// Summary statistics over the off-diagonal distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparabilityReport {
    /// Gesture names in matrix order
    pub names: Vec<String>,
    /// Upper triangle, row-major
    pub pairs: Vec<PairDistance>,
    /// Absent with fewer than two gestures
    pub summary: Option<DistanceSummary>,
    pub verdict: Option<SeparabilityVerdict>,
}

impl SeparabilityReport {
    /// Full symmetric distance matrix with a zero diagonal
    pub fn distance_matrix(&self) -> Array2<f64> {
        let n = self.names.len();
        let mut matrix = Array2::zeros((n, n));
        let mut pairs = self.pairs.iter();

        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(pair) = pairs.next() {
                    matrix[[i, j]] = pair.distance;
                    matrix[[j, i]] = pair.distance;
                }
            }
        }

        matrix
    }

    /// The closest pair of gestures, if any
    pub fn closest_pair(&self) -> Option<&PairDistance> {
        self.pairs
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Before/after separability of an optimization run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparabilityComparison {
    pub before: SeparabilityReport,
    pub after: SeparabilityReport,
}

impl SeparabilityComparison {
    /// Change in minimum pairwise distance (after - before)
    pub fn min_distance_change(&self) -> Option<f64> {
        match (&self.before.summary, &self.after.summary) {
            (Some(before), Some(after)) => Some(after.min - before.min),
            _ => None,
        }
    }

    pub fn improved(&self) -> bool {
        self.min_distance_change().map_or(false, |delta| delta > 0.0)
    }
}

/// Counters and warnings collected during one training session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingReport {
    pub total_frames: usize,
    pub frames_with_hand: usize,
    pub stable_frames: usize,
    pub degenerate_frames: usize,
    pub stopped_early: bool,
    pub warnings: Vec<String>,
}
