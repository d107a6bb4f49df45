//! Error types for the store_forecast crate

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;
use tree_boost::BoostError;

/// Custom error types for the store_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A master, batch, model or hyperparameter file does not exist
    #[error("Missing input file: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// A required column is absent from an input table
    #[error("Schema mismatch in {source_name}: missing columns {missing:?}")]
    SchemaMismatch {
        source_name: String,
        missing: Vec<String>,
    },

    /// The model artifact is unreadable or incompatible
    #[error("Failed to load model from {}: {reason}", path.display())]
    ModelLoadFailure { path: PathBuf, reason: String },

    /// Feature columns at prediction time differ from those the model was trained on
    #[error("Prediction shape mismatch: model expects {expected:?}, got {found:?}")]
    PredictionShapeMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised by the tree ensemble
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<BoostError> for ForecastError {
    fn from(err: BoostError) -> Self {
        match err {
            BoostError::FeatureMismatch { expected, found } => {
                ForecastError::PredictionShapeMismatch { expected, found }
            }
            other => ForecastError::ModelError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::DataError(format!("JSON error: {}", err))
    }
}
