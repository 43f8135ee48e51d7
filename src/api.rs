//! HTTP API for churn prediction
//!
//! ## Endpoints
//!
//! - `POST /predict` - Churn probability and decision
//! - `POST /explain` - Top feature-level drivers of the prediction
//! - `GET /health` - Liveness and loaded contract size
//! - `GET /metrics` - Serving counters as JSON

use crate::error::ServiceError;
use crate::metrics::MetricsSnapshot;
use crate::service::PredictionService;
use crate::types::{AttributionResult, PredictionResult, RawCustomerRecord};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> &Arc<PredictionService> {
        &self.service
    }
}

/// Error response mapped from service failures
#[derive(Debug)]
pub enum ApiError {
    /// Body could not be parsed into a customer record
    Rejected(String),
    Service(ServiceError),
    /// Worker task panicked or was cancelled
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        ApiError::Service(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Rejected(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            ApiError::Rejected(detail) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", detail),
            ApiError::Service(ServiceError::Validation(e)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", e.to_string())
            }
            ApiError::Service(ServiceError::Inference(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "inference", e.to_string())
            }
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", detail),
        };
        (status, Json(ErrorBody { error, detail })).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub features: usize,
}

/// Build the CORS layer for the configured origins.
///
/// `["*"]` allows any origin; otherwise credentials are allowed for the
/// listed origins only.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {:?}", o)))
        .collect::<Result<Vec<_>>>()?;

    Ok(layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

/// Create the router with all endpoints
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/explain", post(explain))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a service call on the blocking pool; inference is CPU-bound.
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&PredictionService) -> Result<T, ServiceError> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| {
            warn!(error = %e, "Request worker failed");
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<RawCustomerRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(record) = payload.map_err(reject(&state))?;
    let result = run_blocking(&state, move |service| service.predict(&record)).await?;
    Ok(Json(result))
}

async fn explain(
    State(state): State<AppState>,
    payload: Result<Json<RawCustomerRecord>, JsonRejection>,
) -> Result<Json<AttributionResult>, ApiError> {
    let Json(record) = payload.map_err(reject(&state))?;
    let result = run_blocking(&state, move |service| service.explain_prediction(&record)).await?;
    Ok(Json(result))
}

fn reject(state: &AppState) -> impl FnOnce(JsonRejection) -> ApiError + '_ {
    move |rejection| {
        state.service.metrics().record_validation_failure();
        warn!(error = %rejection.body_text(), "Request body rejected");
        ApiError::from(rejection)
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.service.model_name().to_string(),
        features: state.service.contract().len(),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot())
}
