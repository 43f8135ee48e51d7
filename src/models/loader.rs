//! Model artifact loading

use crate::artifacts::FeatureContract;
use crate::config::{ModelBackend, ModelConfig};
use crate::error::ContractLoadError;
use crate::models::inference::ChurnModel;
use crate::models::linear::LinearChurnModel;
use crate::models::onnx::OnnxChurnModel;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loaded ONNX session with its tensor names
pub struct LoadedSession {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
}

/// Loader for ONNX sessions
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Initialize ONNX Runtime with the given intra-op thread count
    pub fn with_threads(onnx_threads: usize) -> Result<Self, ContractLoadError> {
        ort::init().commit().map_err(|e| ContractLoadError::Model {
            path: Default::default(),
            reason: format!("ONNX Runtime failed to initialize: {}", e),
        })?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_session<P: AsRef<Path>>(&self, path: P) -> Result<LoadedSession, ContractLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ContractLoadError::Model {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = build_session(path, self.onnx_threads).map_err(|e| ContractLoadError::Model {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedSession {
            name,
            session,
            input_name,
            output_name,
        })
    }
}

fn build_session(path: &Path, onnx_threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(onnx_threads)?
        .commit_from_file(path)?;
    Ok(session)
}

/// Load the configured model backend and bind it to the feature contract.
///
/// Called once at startup; any error prevents the service from serving.
pub fn load_model(
    config: &ModelConfig,
    contract: &FeatureContract,
) -> Result<Arc<dyn ChurnModel>, ContractLoadError> {
    let model: Arc<dyn ChurnModel> = match config.backend {
        ModelBackend::Linear => Arc::new(LinearChurnModel::from_path(&config.path, contract)?),
        ModelBackend::Onnx => {
            let loader = ModelLoader::with_threads(config.onnx_threads)?;
            let session = loader.load_session(&config.path)?;
            Arc::new(OnnxChurnModel::new(session, contract)?)
        }
    };

    info!(backend = ?config.backend, model = %model.name(), "Inference adapter ready");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_contract;

    #[test]
    fn test_missing_linear_artifact_is_fatal() {
        let config = ModelConfig {
            backend: ModelBackend::Linear,
            path: "/nonexistent/linear_churn.json".to_string(),
            onnx_threads: 1,
        };

        assert!(matches!(
            load_model(&config, &sample_contract()),
            Err(ContractLoadError::Read { .. })
        ));
    }

    #[test]
    fn test_shipped_linear_artifact_binds_to_shipped_contract() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let contract = crate::artifacts::ArtifactLoader::new(&crate::config::ArtifactsConfig {
            feature_list: root.join("artifacts/feature_list.json").display().to_string(),
            cat_columns: root.join("artifacts/cat_columns.json").display().to_string(),
            category_levels: Some(root.join("artifacts/category_levels.json").display().to_string()),
        })
        .load()
        .unwrap();

        let config = ModelConfig {
            backend: ModelBackend::Linear,
            path: root.join("artifacts/linear_churn.json").display().to_string(),
            onnx_threads: 1,
        };

        let model = load_model(&config, &contract).unwrap();
        assert_eq!(model.name(), "telco-logistic-v1");
    }
}
