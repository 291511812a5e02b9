/// Gesture signature records and signature sets
///
/// Field names on the wire are a contract with downstream matchers. Unknown
/// fields are carried through untouched.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, SignatureError};
use crate::models::pose::{euclidean_distance, NormalizedPose};

pub const SIGNATURE_KIND_UNIMANUAL: &str = "unimanual";
pub const SIGNATURE_ALGORITHM: &str = "POSE_STATIC_FULLHAND_CENTERED_NORMALIZED";

/// Sigma assumed for records that do not carry one
pub const DEFAULT_SIGMA: f64 = 0.01;

fn default_kind() -> String {
    SIGNATURE_KIND_UNIMANUAL.to_string()
}

fn default_algorithm() -> String {
    SIGNATURE_ALGORITHM.to_string()
}

fn default_sigma() -> f64 {
    DEFAULT_SIGMA
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Intra-class distance distribution observed during training
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureStatistics {
    #[serde(rename = "distancia_media", default)]
    pub mean_distance: f64,
    #[serde(rename = "distancia_maxima", default)]
    pub max_distance: f64,
    #[serde(rename = "distancia_minima", default)]
    pub min_distance: f64,
    #[serde(rename = "percentil_95", default)]
    pub percentile_95: f64,
    #[serde(rename = "norma_promedio_original", default)]
    pub mean_original_scale: f64,
}

/// Provenance of a signature; additive across pipeline runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureMetadata {
    #[serde(rename = "frames_estables", default, skip_serializing_if = "Option::is_none")]
    pub stable_frames: Option<usize>,

    #[serde(rename = "frames_totales", default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<usize>,

    #[serde(
        rename = "fecha_entrenamiento",
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub trained_at: Option<DateTime<Utc>>,

    #[serde(rename = "num_landmarks", default, skip_serializing_if = "Option::is_none")]
    pub num_landmarks: Option<usize>,

    #[serde(rename = "optimizado", default, skip_serializing_if = "is_false")]
    pub optimized: bool,

    #[serde(
        rename = "fecha_optimizacion",
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub optimized_at: Option<DateTime<Utc>>,

    #[serde(rename = "tecnicas", default, skip_serializing_if = "Vec::is_empty")]
    pub techniques: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Statistical summary representing one gesture class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSignature {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "tipo", default = "default_kind")]
    pub kind: String,

    #[serde(rename = "dimensiones")]
    pub dimension: usize,

    #[serde(rename = "firma_promedio")]
    pub mean_vector: Vec<f64>,

    /// Mean intra-class distance to the mean vector
    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Acceptance radius around `mean_vector`
    #[serde(rename = "umbral")]
    pub threshold: f64,

    #[serde(rename = "algoritmo", default = "default_algorithm")]
    pub algorithm: String,

    #[serde(rename = "estadisticas", default)]
    pub statistics: SignatureStatistics,

    #[serde(default)]
    pub metadata: SignatureMetadata,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GestureSignature {
    pub fn mean_array(&self) -> Array1<f64> {
        Array1::from(self.mean_vector.clone())
    }

    /// Copy of this signature with a replaced mean vector; everything else is untouched
    pub fn with_mean_vector(&self, mean_vector: Vec<f64>) -> Self {
        Self {
            mean_vector,
            ..self.clone()
        }
    }

    /// Euclidean distance from a candidate pose to the mean vector
    pub fn distance_to(&self, pose: &NormalizedPose) -> Result<f64> {
        if pose.values().len() != self.mean_vector.len() {
            return Err(SignatureError::DimensionMismatch {
                name: self.name.clone(),
                expected: self.mean_vector.len(),
                found: pose.values().len(),
            });
        }
        euclidean_distance(&self.mean_array(), pose.values())
    }

    /// A pose matches iff its distance to the mean vector is within the threshold
    pub fn accepts(&self, pose: &NormalizedPose) -> Result<bool> {
        Ok(self.distance_to(pose)? <= self.threshold)
    }
}

/// Gesture name -> signature, iterated in name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureSet {
    signatures: BTreeMap<String, GestureSignature>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_signatures<I>(signatures: I) -> Result<Self>
    where
        I: IntoIterator<Item = GestureSignature>,
    {
        let mut set = Self::new();
        for signature in signatures {
            set.insert(signature)?;
        }
        Ok(set)
    }

    /// Add a signature; names must be unique
    pub fn insert(&mut self, signature: GestureSignature) -> Result<()> {
        if self.signatures.contains_key(&signature.name) {
            return Err(SignatureError::DuplicateGesture(signature.name));
        }
        self.signatures.insert(signature.name.clone(), signature);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&GestureSignature> {
        self.signatures.get(name)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.signatures.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureSignature> {
        self.signatures.values()
    }

    /// Check every record against the shared dimension, returning it.
    ///
    /// A record is consistent when its declared dimension matches its mean
    /// vector length and the first record's dimension.
    pub fn validate_dimensions(&self) -> Result<usize> {
        let first = self.iter().next().ok_or(SignatureError::EmptySignatureSet)?;
        let expected = first.dimension;

        for signature in self.iter() {
            if signature.dimension != expected {
                return Err(SignatureError::DimensionMismatch {
                    name: signature.name.clone(),
                    expected,
                    found: signature.dimension,
                });
            }
            if signature.mean_vector.len() != expected {
                return Err(SignatureError::DimensionMismatch {
                    name: signature.name.clone(),
                    expected,
                    found: signature.mean_vector.len(),
                });
            }
        }

        Ok(expected)
    }

    /// Mean vectors stacked as rows (gestures) x columns (features), in name order
    pub fn mean_matrix(&self) -> Result<Array2<f64>> {
        let dim = self.validate_dimensions()?;
        let rows: Vec<&GestureSignature> = self.iter().collect();
        Ok(Array2::from_shape_fn((rows.len(), dim), |(i, j)| {
            rows[i].mean_vector[j]
        }))
    }

    /// New set whose mean vectors are the rows of `matrix`, in name order
    pub fn with_mean_matrix(&self, matrix: &Array2<f64>) -> Result<Self> {
        if matrix.nrows() != self.len() {
            return Err(SignatureError::Numeric(format!(
                "matrix has {} rows for {} signatures",
                matrix.nrows(),
                self.len()
            )));
        }
        let signatures = self
            .iter()
            .zip(matrix.rows())
            .map(|(signature, row)| {
                let vector = row_to_vec(row);
                (signature.name.clone(), signature.with_mean_vector(vector))
            })
            .collect();
        Ok(Self { signatures })
    }

    /// New set built by mapping every signature; keys are preserved
    pub fn map_signatures<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&GestureSignature) -> GestureSignature,
    {
        let signatures = self
            .signatures
            .iter()
            .map(|(name, signature)| (name.clone(), f(signature)))
            .collect();
        Self { signatures }
    }
}

impl IntoIterator for SignatureSet {
    type Item = GestureSignature;
    type IntoIter = std::collections::btree_map::IntoValues<String, GestureSignature>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.into_values()
    }
}

fn row_to_vec(row: ArrayView1<f64>) -> Vec<f64> {
    row.iter().copied().collect()
}

/// Reads RFC 3339, naive ISO date-times and bare dates (as UTC); writes RFC 3339
mod flexible_timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) => parse(&text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", text))),
        }
    }

    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Some(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}
