//! Churn Predictor - Main Entry Point
//!
//! Loads the feature contract and model once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use churn_predictor::{
    api::{cors_layer, create_router, AppState},
    artifacts::ArtifactLoader,
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    features::{FeatureDeriver, TechIssuePolicy},
    metrics::{MetricsReporter, ServiceMetrics},
    models::load_model,
    service::PredictionService,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "churn-predictor", version, about = "Customer churn prediction API")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "CHURN_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    // Initialize logging
    churn_predictor::init_tracing(&config.logging)?;

    info!("Starting Churn Predictor");
    info!(
        "Configuration loaded from {} (threshold {:.2}, top {} drivers)",
        cli.config, config.prediction.threshold, config.prediction.max_drivers
    );

    // Feature contract and model are loaded once; any failure stops startup
    let contract = ArtifactLoader::new(&config.artifacts)
        .load()
        .context("Feature contract could not be loaded")?;
    let model = load_model(&config.model, &contract).context("Model could not be loaded")?;

    let policy = config.features.tech_issue_policy;
    if policy == TechIssuePolicy::NoInternetLegacy {
        warn!("TechIssueRisk uses the legacy no-internet definition; it is constant 0 on Telco data");
    }
    info!(
        features = contract.len(),
        categorical = contract.categorical_columns().len(),
        tech_issue_policy = ?policy,
        "Feature pipeline ready"
    );

    let metrics = Arc::new(ServiceMetrics::new());
    let service = PredictionService::new(
        Arc::new(contract),
        model,
        FeatureDeriver::new(policy),
        config.prediction.threshold,
        config.prediction.max_drivers,
    )
    .with_metrics(metrics.clone());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let cors = cors_layer(&config.server.cors_origins)?;
    let app = create_router(AppState::new(service), cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("CORS origins: {:?}", config.server.cors_origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Print final summary
    info!("Churn Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
