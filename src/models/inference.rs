//! Inference adapter interface shared by all model backends

use crate::error::InferenceError;
use crate::features::FeatureVector;

/// A loaded churn model and its attribution explainer.
///
/// Implementations are read-only after construction and shared across
/// request workers.
pub trait ChurnModel: Send + Sync {
    /// Backend name for logs and health checks
    fn name(&self) -> &str;

    /// Churn probability in `[0, 1]`.
    fn predict(&self, vector: &FeatureVector) -> Result<f64, InferenceError>;

    /// Signed attribution per feature, aligned 1:1 with the vector's columns.
    fn explain(&self, vector: &FeatureVector) -> Result<Vec<f64>, InferenceError>;
}

/// Reject a vector whose columns differ from the ones the model was bound to.
pub fn check_columns(expected: &[String], vector: &FeatureVector) -> Result<(), InferenceError> {
    if vector.len() != expected.len() {
        return Err(InferenceError::ShapeMismatch {
            expected: expected.len(),
            actual: vector.len(),
        });
    }

    match expected
        .iter()
        .zip(vector.columns())
        .position(|(want, got)| want != got)
    {
        Some(position) => Err(InferenceError::ColumnMismatch {
            position,
            expected: expected[position].clone(),
            actual: vector.columns()[position].clone(),
        }),
        None => Ok(()),
    }
}

/// Pass through probabilities in `[0, 1]`, reject anything else.
pub fn checked_probability(probability: f64) -> Result<f64, InferenceError> {
    if probability.is_finite() && (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(InferenceError::InvalidProbability(probability))
    }
}
