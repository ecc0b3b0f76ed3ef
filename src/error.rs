//! Crate-wide error taxonomy
//!
//! Cleaning and feature stages fail fast on malformed input instead of
//! coercing silently; inference reports a missing artifact bundle rather
//! than fabricating a prediction.

use thiserror::Error;

/// Errors produced by the preprocessing pipeline, training, and inference
#[derive(Debug, Error)]
pub enum Error {
    /// A stage needed a column the input frame does not have
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column was present but held the wrong kind of data
    #[error("Column '{0}' has the wrong type: expected {1}")]
    ColumnType(String, &'static str),

    /// Input frame became (or arrived) empty before a stage that needs rows
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A statistical computation degenerated (zero variance, NaN spread)
    #[error("Degenerate statistics: {0}")]
    DegenerateStatistics(String),

    /// WCSS curve had no identifiable elbow; caller must pick k explicitly
    #[error("No elbow found in WCSS curve over k in [1, {k_limit})")]
    NoElbow { k_limit: usize },

    /// A categorical value outside the training-time scheme reached inference
    #[error("Unknown category at inference: {0}")]
    UnknownCategory(String),

    /// Inference was invoked before any artifact bundle was loaded
    #[error("Models not loaded for operation '{0}'")]
    ModelsNotLoaded(String),

    /// Persisted artifact bundle is missing or does not deserialize
    #[error("Artifact bundle error: {0}")]
    ArtifactLoad(String),

    /// Invalid coordinate handed to the geohash codec
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// I/O failure reading records or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure in the artifact layer
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
