//! Prediction and attribution response shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Churn probability (0.0 - 1.0)
    pub probability: f64,
    /// `probability >= threshold`
    #[serde(rename = "isChurn")]
    pub is_churn: bool,
}

impl PredictionResult {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        Self {
            probability,
            is_churn: probability >= threshold,
        }
    }
}

/// One feature-level driver of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    /// Feature value as seen by the model, `null` when not representable
    pub value: Value,
    /// Signed attribution score
    pub impact: f64,
}

/// Outcome of `/explain`: drivers sorted by descending absolute impact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributionResult {
    pub top_drivers: Vec<Driver>,
}
