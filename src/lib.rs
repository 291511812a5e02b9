// Library exports for gesture signature training and optimization

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{DegeneratePolicy, OptimizerConfig, StageKind, TrainerConfig};
pub use error::{Result, SignatureError};
pub use models::{GestureSignature, SeparabilityReport, SignatureSet};
