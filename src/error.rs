//! Error types for the churn prediction service

use std::path::PathBuf;
use thiserror::Error;

/// Raw customer input rejected before feature derivation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Feature contract or model artifact could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ContractLoadError {
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("invalid feature contract: {0}")]
    InvalidContract(String),
    #[error("model artifact {path} could not be loaded: {reason}")]
    Model { path: PathBuf, reason: String },
}

/// The inference backend rejected a feature vector or failed to score it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature vector has {actual} columns, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("column {position} is {actual:?}, model expects {expected:?}")]
    ColumnMismatch {
        position: usize,
        expected: String,
        actual: String,
    },
    #[error("feature {feature} has an unusable value: {reason}")]
    InvalidValue { feature: String, reason: String },
    #[error("model produced an invalid probability {0}")]
    InvalidProbability(f64),
    #[error("explainer returned {actual} attributions for {expected} features")]
    AttributionShape { expected: usize, actual: usize },
    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Failure of a single prediction request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Offline preprocessing failure.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("dataset is missing required column {0}")]
    MissingColumn(String),
    #[error("column {column} has {actual} rows, frame has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Contract(#[from] ContractLoadError),
}
