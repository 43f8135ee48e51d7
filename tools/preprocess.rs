//! Batch Preprocessor
//!
//! Derives engineered features over a customer CSV and writes the table the
//! model is trained and evaluated on.

use anyhow::{Context, Result};
use churn_predictor::{
    artifacts::ArtifactLoader,
    batch::{prepare_for_model, preprocess, Frame},
    config::AppConfig,
    error::BatchError,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "churn-preprocess",
    version,
    about = "Derive churn features over a customer dataset"
)]
struct Cli {
    /// Raw customer CSV with a header row
    #[arg(short, long)]
    input: PathBuf,

    /// Destination CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (artifact paths, TechIssueRisk policy, logging)
    #[arg(short, long, env = "CHURN_CONFIG")]
    config: Option<PathBuf>,

    /// Keep every input column and only append the derived ones
    #[arg(long)]
    derive_only: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    churn_predictor::init_tracing(&config.logging)?;

    info!("Starting Churn Preprocessor");
    let start = Instant::now();

    let output = prepare(&cli.input, cli.derive_only, &config)
        .with_context(|| format!("Failed to preprocess {}", cli.input.display()))?;

    output
        .to_path(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    info!(
        rows = output.len(),
        columns = output.width(),
        tech_issue_policy = ?config.features.tech_issue_policy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Prepared dataframe written to {}",
        cli.output.display()
    );

    Ok(())
}

/// Read, derive and, unless `derive_only`, shape the dataset to the feature
/// contract. A contract that cannot be loaded is fatal.
fn prepare(input: &Path, derive_only: bool, config: &AppConfig) -> Result<Frame, BatchError> {
    let raw = Frame::from_path(input)?;
    info!(rows = raw.len(), columns = raw.width(), "Loaded {}", input.display());

    let derived = preprocess(&raw, config.features.tech_issue_policy)?;
    if derive_only {
        return Ok(derived);
    }

    let contract = ArtifactLoader::new(&config.artifacts).load()?;
    Ok(prepare_for_model(&derived, &contract))
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_predictor::error::ContractLoadError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DATASET: &str = "\
customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,0,Yes,No,1,No,No phone service,DSL,No,Yes,No,No,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,No
5575-GNVDE,Male,0,No,No,34,Yes,No,DSL,Yes,No,Yes,No,No,No,One year,No,Mailed check,56.95,1889.5,No
9237-HQITU,Female,0,No,No,2,Yes,No,Fiber optic,No,No,No,No,No,No,Month-to-month,Yes,Electronic check,70.7,151.65,Yes
";

    fn dataset() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();
        file
    }

    fn shipped_config() -> AppConfig {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let mut config = AppConfig::default();
        config.artifacts.feature_list = root.join("artifacts/feature_list.json").display().to_string();
        config.artifacts.cat_columns = root.join("artifacts/cat_columns.json").display().to_string();
        config.artifacts.category_levels = None;
        config
    }

    #[test]
    fn test_derive_only_keeps_input_columns() {
        let input = dataset();
        let mut config = AppConfig::default();
        config.artifacts.feature_list = "/nonexistent/feature_list.json".to_string();

        let frame = prepare(input.path(), true, &config).unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.width(), 21 + 7);
        assert!(frame.column("customerID").is_some());
        assert!(frame.column("TenureGroup").is_some());
    }

    #[test]
    fn test_shapes_output_to_contract() {
        let input = dataset();

        let frame = prepare(input.path(), false, &shipped_config()).unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.width(), 25);
        assert_eq!(frame.column_names()[0], "MonthlyCharges");
        assert!(frame.column("Churn").is_none());
    }

    #[test]
    fn test_missing_contract_is_fatal() {
        let input = dataset();
        let mut config = AppConfig::default();
        config.artifacts.feature_list = "/nonexistent/feature_list.json".to_string();

        assert!(matches!(
            prepare(input.path(), false, &config),
            Err(BatchError::Contract(ContractLoadError::Read { .. }))
        ));
    }

    #[test]
    fn test_prepared_output_writes_csv() {
        let input = dataset();
        let output = NamedTempFile::new().unwrap();

        let frame = prepare(input.path(), false, &shipped_config()).unwrap();
        frame.to_path(output.path()).unwrap();

        let written = Frame::from_path(output.path()).unwrap();
        assert_eq!(written.column_names(), frame.column_names());
        assert_eq!(written.len(), 3);
    }
}
