use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the training and optimization pipelines
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Frame source unavailable at {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed frame at line {line}: {message}")]
    MalformedFrame { line: usize, message: String },

    #[error("Expected {expected} landmarks, got {found}")]
    InvalidLandmarkCount { expected: usize, found: usize },

    #[error(
        "Too few stable frames: {accepted}/{required} minimum. \
         Hold the hand still for longer, record a longer clip, \
         raise the stability threshold (current: {stability_threshold}) \
         or lower the minimum frame count (current: {required})"
    )]
    InsufficientSamples {
        accepted: usize,
        required: usize,
        stability_threshold: f64,
    },

    #[error("Dimension mismatch in signature '{name}': expected {expected}, found {found}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Signature set is empty")]
    EmptySignatureSet,

    #[error("Duplicate gesture name: {0}")]
    DuplicateGesture(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Numeric error: {0}")]
    Numeric(String),
}

pub type Result<T> = std::result::Result<T, SignatureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_samples_message_has_guidance() {
        let err = SignatureError::InsufficientSamples {
            accepted: 4,
            required: 5,
            stability_threshold: 0.03,
        };
        let message = err.to_string();
        assert!(message.contains("4/5"));
        assert!(message.contains("stability threshold"));
        assert!(message.contains("0.03"));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = SignatureError::DimensionMismatch {
            name: "hola".to_string(),
            expected: 42,
            found: 40,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in signature 'hola': expected 42, found 40"
        );
    }
}
