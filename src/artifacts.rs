//! Feature contract artifacts: the ordered feature list and categorical
//! column list the model was trained with.

use crate::config::ArtifactsConfig;
use crate::error::ContractLoadError;
use crate::types::FeatureValue;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column contract between feature assembly and the model.
///
/// Immutable once loaded; shared read-only for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContract {
    feature_names: Vec<String>,
    categorical_columns: Vec<String>,
    categorical_set: HashSet<String>,
    category_levels: HashMap<String, Vec<String>>,
}

impl FeatureContract {
    /// Build a contract, rejecting empty or duplicated feature lists and
    /// categorical columns that are not features.
    pub fn new(
        feature_names: Vec<String>,
        categorical_columns: Vec<String>,
    ) -> Result<Self, ContractLoadError> {
        if feature_names.is_empty() {
            return Err(ContractLoadError::InvalidContract(
                "feature list is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ContractLoadError::InvalidContract(format!(
                    "feature {} appears more than once",
                    name
                )));
            }
        }

        if let Some(stray) = categorical_columns.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(ContractLoadError::InvalidContract(format!(
                "categorical column {} is not in the feature list",
                stray
            )));
        }

        let categorical_set = categorical_columns.iter().cloned().collect();
        Ok(Self {
            feature_names,
            categorical_columns,
            categorical_set,
            category_levels: HashMap::new(),
        })
    }

    /// Attach the ordered level list of each categorical column.
    pub fn with_category_levels(
        mut self,
        levels: HashMap<String, Vec<String>>,
    ) -> Result<Self, ContractLoadError> {
        if let Some(stray) = levels.keys().find(|c| !self.is_categorical(c)) {
            return Err(ContractLoadError::InvalidContract(format!(
                "category levels given for non-categorical column {}",
                stray
            )));
        }
        self.category_levels = levels;
        Ok(self)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical_set.contains(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    pub fn category_levels(&self, name: &str) -> Option<&[String]> {
        self.category_levels.get(name).map(Vec::as_slice)
    }

    /// Apply the column's categorical encoding to a value.
    pub fn encode_column(&self, name: &str, value: FeatureValue) -> FeatureValue {
        if self.is_categorical(name) {
            value.into_categorical()
        } else {
            value
        }
    }
}

/// Loads the feature contract from the artifact store at startup.
pub struct ArtifactLoader {
    feature_list: PathBuf,
    cat_columns: PathBuf,
    category_levels: Option<PathBuf>,
}

impl ArtifactLoader {
    pub fn new(config: &ArtifactsConfig) -> Self {
        Self {
            feature_list: PathBuf::from(&config.feature_list),
            cat_columns: PathBuf::from(&config.cat_columns),
            category_levels: config.category_levels.as_ref().map(PathBuf::from),
        }
    }

    /// Read and validate all contract artifacts. No retry: a missing or
    /// malformed artifact is a broken deployment.
    pub fn load(&self) -> Result<FeatureContract, ContractLoadError> {
        let feature_names = read_string_list(&self.feature_list)?;
        let categorical = read_string_list(&self.cat_columns)?;
        let mut contract = FeatureContract::new(feature_names, categorical)?;

        if let Some(path) = &self.category_levels {
            contract = contract.with_category_levels(read_level_map(path)?)?;
        }

        info!(
            features = contract.len(),
            categorical = contract.categorical_columns().len(),
            feature_list = %self.feature_list.display(),
            "Feature contract loaded"
        );

        Ok(contract)
    }
}

fn read_json(path: &Path) -> Result<Value, ContractLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ContractLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ContractLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Read a JSON array of strings.
pub fn read_string_list(path: &Path) -> Result<Vec<String>, ContractLoadError> {
    let value = read_json(path)?;
    string_list(&value).ok_or_else(|| ContractLoadError::Malformed {
        path: path.to_path_buf(),
        reason: "expected a JSON array of strings".to_string(),
    })
}

fn read_level_map(path: &Path) -> Result<HashMap<String, Vec<String>>, ContractLoadError> {
    let malformed = || ContractLoadError::Malformed {
        path: path.to_path_buf(),
        reason: "expected a JSON object of string arrays".to_string(),
    };

    let value = read_json(path)?;
    let object = value.as_object().ok_or_else(malformed)?;
    object
        .iter()
        .map(|(column, levels)| Ok((column.clone(), string_list(levels).ok_or_else(malformed)?)))
        .collect()
}
