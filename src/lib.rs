//! Customer Churn Prediction Library
//!
//! Serves a trained churn classifier over HTTP. Raw customer attributes are
//! turned into the exact ordered feature vector the model was trained on;
//! the same derivation rules drive the offline batch preprocessor.

pub mod api;
pub mod artifacts;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use artifacts::{ArtifactLoader, FeatureContract};
pub use config::AppConfig;
pub use error::{BatchError, ContractLoadError, InferenceError, ServiceError, ValidationError};
pub use features::{assemble, FeatureDeriver, FeatureVector};
pub use models::ChurnModel;
pub use service::PredictionService;
pub use types::{AttributionResult, PredictionResult, RawCustomerRecord};

/// Initialize the global tracing subscriber from the logging configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &config::LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("churn_predictor={}", logging.level).parse()?)
            .add_directive(format!("churn_preprocess={}", logging.level).parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}
