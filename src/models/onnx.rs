//! ONNX Runtime churn model

use crate::artifacts::FeatureContract;
use crate::error::{ContractLoadError, InferenceError};
use crate::features::FeatureVector;
use crate::models::inference::{check_columns, checked_probability, ChurnModel};
use crate::models::loader::LoadedSession;
use crate::types::FeatureValue;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Float encoding of one contract column.
#[derive(Debug, Clone)]
enum ColumnEncoding {
    Numeric,
    /// Level → index in the training level list
    Categorical(HashMap<String, f32>),
}

/// Code for a category level the model never saw.
const UNKNOWN_LEVEL: f32 = -1.0;

/// ONNX model taking a `[1, n_features]` float tensor.
///
/// Attributions are single-feature occlusions: the drop in probability when
/// a column is replaced by its zero encoding.
pub struct OnnxChurnModel {
    name: String,
    /// `Session::run` needs exclusive access
    session: Mutex<LoadedSession>,
    columns: Vec<String>,
    encodings: Vec<ColumnEncoding>,
}

impl OnnxChurnModel {
    /// Wrap a loaded session, building category encodings from the contract.
    pub fn new(session: LoadedSession, contract: &FeatureContract) -> Result<Self, ContractLoadError> {
        let encodings = column_encodings(contract)?;

        Ok(Self {
            name: session.name.clone(),
            session: Mutex::new(session),
            columns: contract.feature_names().to_vec(),
            encodings,
        })
    }

    /// Run the session on one encoded row.
    fn run(&self, row: &[f32]) -> Result<f64, InferenceError> {
        let shape = vec![1_i64, row.len() as i64];
        let input_tensor = Tensor::from_array((shape, row.to_vec()))
            .map_err(|e| InferenceError::Runtime(format!("failed to create input tensor: {}", e)))?;

        let mut loaded = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("session lock poisoned: {}", e)))?;
        let LoadedSession {
            session,
            input_name,
            output_name,
            name,
        } = &mut *loaded;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(runtime)?;

        let probability = extract_probability(&outputs, output_name, name)?;
        checked_probability(probability)
    }
}

impl ChurnModel for OnnxChurnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, vector: &FeatureVector) -> Result<f64, InferenceError> {
        let row = encode_row(&self.columns, &self.encodings, vector)?;
        self.run(&row)
    }

    fn explain(&self, vector: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        let row = encode_row(&self.columns, &self.encodings, vector)?;
        let attributions = occlusion_attributions(&row, |r| self.run(r))?;

        debug!(model = %self.name, features = attributions.len(), "Occlusion attributions computed");
        Ok(attributions)
    }
}

/// Float encoding of every contract column. Categorical columns need a
/// level list.
fn column_encodings(contract: &FeatureContract) -> Result<Vec<ColumnEncoding>, ContractLoadError> {
    contract
        .feature_names()
        .iter()
        .map(|name| {
            if !contract.is_categorical(name) {
                return Ok(ColumnEncoding::Numeric);
            }
            let levels = contract.category_levels(name).ok_or_else(|| {
                ContractLoadError::InvalidContract(format!(
                    "categorical column {} has no category levels; the ONNX backend needs them",
                    name
                ))
            })?;
            Ok(ColumnEncoding::Categorical(
                levels
                    .iter()
                    .enumerate()
                    .map(|(i, level)| (level.clone(), i as f32))
                    .collect(),
            ))
        })
        .collect()
}

/// Encode a vector as one float row: numbers as-is, levels as their index,
/// unknown levels as -1 and missing values as NaN.
fn encode_row(
    columns: &[String],
    encodings: &[ColumnEncoding],
    vector: &FeatureVector,
) -> Result<Vec<f32>, InferenceError> {
    check_columns(columns, vector)?;

    encodings
        .iter()
        .zip(vector.iter())
        .map(|(encoding, (feature, value))| match (encoding, value) {
            (_, FeatureValue::Missing) => Ok(f32::NAN),
            (ColumnEncoding::Numeric, FeatureValue::Number(x)) => Ok(*x as f32),
            (ColumnEncoding::Categorical(levels), FeatureValue::Text(level)) => {
                Ok(levels.get(level).copied().unwrap_or(UNKNOWN_LEVEL))
            }
            (_, other) => Err(InferenceError::InvalidValue {
                feature: feature.to_string(),
                reason: format!("cannot encode {:?} for this column", other),
            }),
        })
        .collect()
}

/// Drop in score when each column alone is set to zero.
fn occlusion_attributions<F>(row: &[f32], mut score: F) -> Result<Vec<f64>, InferenceError>
where
    F: FnMut(&[f32]) -> Result<f64, InferenceError>,
{
    let full = score(row)?;

    let mut attributions = Vec::with_capacity(row.len());
    let mut occluded = row.to_vec();
    for i in 0..row.len() {
        occluded[i] = 0.0;
        attributions.push(full - score(&occluded)?);
        occluded[i] = row[i];
    }
    Ok(attributions)
}

/// Read the churn probability from either a probability tensor or a
/// `seq(map(int64, float))` output.
fn extract_probability(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
    model_name: &str,
) -> Result<f64, InferenceError> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(prob) = probability_from_value(output, model_name) {
            return Ok(prob);
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(prob) = probability_from_value(&output, model_name) {
            debug!(model = %model_name, output = %name, "Probability read from fallback output");
            return Ok(prob);
        }
    }

    warn!(model = %model_name, "No probability output found");
    Err(InferenceError::Runtime(format!(
        "model {} produced no readable probability output",
        model_name
    )))
}

fn probability_from_value(output: &ort::value::DynValue, model_name: &str) -> Option<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return churn_prob_from_tensor(&dims, data);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        match churn_prob_from_sequence_map(output) {
            Ok(prob) => return Some(prob),
            Err(e) => debug!(model = %model_name, error = %e, "seq(map) extraction failed"),
        }
    }
    None
}

/// `[batch, classes]` or `[classes]`: class 1 when there are two or more
/// classes, else the single value.
fn churn_prob_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = *dims.last()?;
    let value = if classes >= 2 { data.get(1) } else { data.first() };
    value.map(|&v| f64::from(v))
}

fn churn_prob_from_sequence_map(output: &ort::value::DynValue) -> Result<f64, InferenceError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(runtime)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(runtime)?;
    let first = maps
        .first()
        .ok_or_else(|| InferenceError::Runtime("empty probability sequence".to_string()))?;
    let pairs = first.try_extract_key_values::<i64, f32>().map_err(runtime)?;

    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(f64::from(*prob));
    }
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - f64::from(*prob));
    }
    Err(InferenceError::Runtime(
        "probability map has neither class 0 nor class 1".to_string(),
    ))
}

fn runtime<E: std::fmt::Display>(e: E) -> InferenceError {
    InferenceError::Runtime(e.to_string())
}
