//! Assembly of raw and derived fields into the model's ordered input.

use crate::artifacts::FeatureContract;
use crate::features::deriver::DerivedFeatures;
use crate::types::{FeatureValue, RawCustomerRecord};

/// Ordered model input for one customer.
///
/// Columns are exactly the contract's feature names, in contract order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    /// Build a vector from parallel columns and values.
    ///
    /// Intended for backends and tests; the serving path goes through
    /// [`assemble`].
    pub fn from_parts(columns: Vec<String>, values: Vec<FeatureValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Resolve every contract column from the raw record, then the derived
/// features, else numeric zero.
///
/// A contract column that neither source knows is zero-filled without
/// error, so a misspelled contract name silently degrades predictions.
pub fn assemble(
    raw: &RawCustomerRecord,
    derived: &DerivedFeatures,
    contract: &FeatureContract,
) -> FeatureVector {
    let values = contract
        .feature_names()
        .iter()
        .map(|name| {
            let value = raw
                .field(name)
                .or_else(|| derived.field(name))
                .unwrap_or(FeatureValue::Number(0.0));
            contract.encode_column(name, value)
        })
        .collect();

    FeatureVector {
        columns: contract.feature_names().to_vec(),
        values,
    }
}
