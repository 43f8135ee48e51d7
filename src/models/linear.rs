//! Logistic churn model with exact additive attributions.
//!
//! The artifact is a JSON document:
//!
//! ```json
//! {
//!   "name": "telco-logistic-v1",
//!   "intercept": -1.1,
//!   "numeric": { "tenure": { "weight": -0.035, "mean": 32.4 } },
//!   "categorical": {
//!     "Contract": { "levels": { "Month-to-month": 0.9 }, "baseline": 0.3 }
//!   }
//! }
//! ```
//!
//! Attributions are in log-odds space and sum to the logit minus the
//! baseline logit.

use crate::artifacts::FeatureContract;
use crate::error::{ContractLoadError, InferenceError};
use crate::features::FeatureVector;
use crate::models::inference::{check_columns, checked_probability, ChurnModel};
use crate::types::FeatureValue;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct LinearWeights {
    #[serde(default = "default_name")]
    pub name: String,
    pub intercept: f64,
    #[serde(default)]
    pub numeric: HashMap<String, NumericTerm>,
    #[serde(default)]
    pub categorical: HashMap<String, CategoricalTerm>,
}

fn default_name() -> String {
    "linear".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumericTerm {
    pub weight: f64,
    /// Reference value attributions are measured from
    #[serde(default)]
    pub mean: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoricalTerm {
    /// Log-odds weight per level; unknown levels weigh 0
    pub levels: HashMap<String, f64>,
    /// Expected weight over the training data
    #[serde(default)]
    pub baseline: f64,
}

#[derive(Debug, Clone)]
enum Term {
    Numeric(NumericTerm),
    Categorical(CategoricalTerm),
    Unused,
}

/// Logistic model bound to a feature contract.
#[derive(Debug, Clone)]
pub struct LinearChurnModel {
    name: String,
    intercept: f64,
    columns: Vec<String>,
    terms: Vec<Term>,
}

impl LinearChurnModel {
    /// Load the JSON artifact and bind it to the contract.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        contract: &FeatureContract,
    ) -> Result<Self, ContractLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ContractLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let weights: LinearWeights =
            serde_json::from_str(&text).map_err(|source| ContractLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let model = Self::new(weights, contract).map_err(|e| ContractLoadError::Model {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(
            model = %model.name,
            path = %path.display(),
            terms = model.active_terms(),
            "Linear model loaded"
        );

        Ok(model)
    }

    /// Bind loaded weights to the contract's column order.
    ///
    /// Every feature the model uses must be in the contract, with the same
    /// numeric/categorical kind.
    pub fn new(weights: LinearWeights, contract: &FeatureContract) -> Result<Self, ContractLoadError> {
        if !weights.intercept.is_finite() {
            return Err(ContractLoadError::InvalidContract(
                "model intercept is not finite".to_string(),
            ));
        }

        for name in weights.numeric.keys() {
            if contract.position(name).is_none() {
                return Err(ContractLoadError::InvalidContract(format!(
                    "model feature {} is not in the feature contract",
                    name
                )));
            }
            if contract.is_categorical(name) {
                return Err(ContractLoadError::InvalidContract(format!(
                    "model treats {} as numeric but the contract marks it categorical",
                    name
                )));
            }
        }
        for name in weights.categorical.keys() {
            if !contract.is_categorical(name) {
                return Err(ContractLoadError::InvalidContract(format!(
                    "model treats {} as categorical but the contract does not",
                    name
                )));
            }
        }

        let terms = contract
            .feature_names()
            .iter()
            .map(|name| {
                if let Some(term) = weights.numeric.get(name) {
                    Term::Numeric(term.clone())
                } else if let Some(term) = weights.categorical.get(name) {
                    Term::Categorical(term.clone())
                } else {
                    Term::Unused
                }
            })
            .collect();

        Ok(Self {
            name: weights.name,
            intercept: weights.intercept,
            columns: contract.feature_names().to_vec(),
            terms,
        })
    }

    fn active_terms(&self) -> usize {
        self.terms
            .iter()
            .filter(|t| !matches!(t, Term::Unused))
            .count()
    }

    /// Per-column logit contribution and its baseline.
    fn contributions(&self, vector: &FeatureVector) -> Result<Vec<(f64, f64)>, InferenceError> {
        check_columns(&self.columns, vector)?;

        self.terms
            .iter()
            .zip(vector.iter())
            .map(|(term, (feature, value))| match (term, value) {
                (Term::Unused, _) => Ok((0.0, 0.0)),
                (Term::Numeric(t), FeatureValue::Number(x)) => Ok((t.weight * x, t.weight * t.mean)),
                (Term::Categorical(t), FeatureValue::Text(level)) => {
                    Ok((t.levels.get(level).copied().unwrap_or(0.0), t.baseline))
                }
                (Term::Numeric(_), other) => Err(InferenceError::InvalidValue {
                    feature: feature.to_string(),
                    reason: format!("expected a number, got {:?}", other),
                }),
                (Term::Categorical(_), other) => Err(InferenceError::InvalidValue {
                    feature: feature.to_string(),
                    reason: format!("expected a category, got {:?}", other),
                }),
            })
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ChurnModel for LinearChurnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, vector: &FeatureVector) -> Result<f64, InferenceError> {
        let logit = self.intercept
            + self
                .contributions(vector)?
                .iter()
                .map(|(value, _)| value)
                .sum::<f64>();
        checked_probability(sigmoid(logit))
    }

    fn explain(&self, vector: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        Ok(self
            .contributions(vector)?
            .into_iter()
            .map(|(value, baseline)| value - baseline)
            .collect())
    }
}
