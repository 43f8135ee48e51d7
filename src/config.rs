//! Configuration management for the churn prediction service

use crate::features::TechIssuePolicy;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Inference backend used to score feature vectors
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Logistic model from a JSON artifact, exact attributions
    #[default]
    Linear,
    /// ONNX Runtime session, occlusion attributions
    Onnx,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `["*"]` allows any origin without credentials
    pub cors_origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Feature contract artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Ordered feature names (JSON array of strings)
    pub feature_list: String,
    /// Categorical column names (JSON array of strings)
    pub cat_columns: String,
    /// Level list per categorical column, needed by the ONNX backend
    #[serde(default)]
    pub category_levels: Option<String>,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    /// Path to the serialized model
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Decision configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Probability at or above which a customer is flagged as churning
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Number of drivers returned by `/explain`
    #[serde(default = "default_max_drivers")]
    pub max_drivers: usize,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_max_drivers() -> usize {
    5
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_drivers: default_max_drivers(),
        }
    }
}

/// Feature derivation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub tech_issue_policy: TechIssuePolicy,
}

/// Serving metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries, 0 disables
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path, with `CHURN__SECTION__KEY`
    /// environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path.as_ref(), environment())
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.prediction.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            bail!("prediction.threshold must be within [0, 1], got {}", threshold);
        }
        if self.prediction.max_drivers == 0 {
            bail!("prediction.max_drivers must be at least 1");
        }
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        Ok(())
    }
}

/// `CHURN__SECTION__KEY` overrides. Scalars are parsed to their type and
/// `CHURN__SERVER__CORS_ORIGINS` takes a comma-separated list.
fn environment() -> Environment {
    Environment::with_prefix("CHURN")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            artifacts: ArtifactsConfig {
                feature_list: "artifacts/feature_list.json".to_string(),
                cat_columns: "artifacts/cat_columns.json".to_string(),
                category_levels: Some("artifacts/category_levels.json".to_string()),
            },
            model: ModelConfig {
                backend: ModelBackend::Linear,
                path: "artifacts/linear_churn.json".to_string(),
                onnx_threads: 1,
            },
            prediction: PredictionConfig::default(),
            features: FeaturesConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
