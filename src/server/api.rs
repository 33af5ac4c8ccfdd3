//! HTTP API.
//!
//! - GET /
//! - POST /generate-question
//! - GET /health
//! - GET /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, ServerConfig};
use crate::provider::CompletionProvider;
use crate::relay::{CompletionResult, GenerateRequest, RelayError, RelayService};
use crate::server::metrics::Metrics;

pub const WELCOME_MESSAGE: &str = "Welcome to the AI exam";

/// Application state shared across handlers.
pub struct AppState {
    pub relay: RelayService,
    pub metrics: Metrics,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            relay: RelayService::new(provider, &config.provider),
            metrics: Metrics::new()?,
            config,
            start_time: Instant::now(),
        })
    }
}

/// Build the axum router with all routes, CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.server)?;
    let limit = body_limit(&state.config.server);

    Ok(Router::new()
        .route("/", get(index))
        .route("/generate-question", post(generate_question))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(limit)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}

fn body_limit(config: &ServerConfig) -> DefaultBodyLimit {
    match config.max_body_bytes {
        0 => DefaultBodyLimit::disable(),
        limit => DefaultBodyLimit::max(limit),
    }
}

/// Every origin unless a single one is configured.
fn cors_layer(config: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match &config.allowed_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid allowed_origin {origin:?}: {e}"))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

// ─── Error Mapping ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Status code for each failure kind.
pub fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::Validation => StatusCode::BAD_REQUEST,
        RelayError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Failures of the generate-question route. A body that could not be read
/// at all keeps the status axum gives it; everything else is a relay error.
#[derive(Debug)]
pub enum ApiError {
    Relay(RelayError),
    Body { status: StatusCode, message: String },
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::Relay(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Relay(err) => err.into_response(),
            ApiError::Body { status, message } => {
                (status, Json(ErrorBody { error: message })).into_response()
            }
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub model: String,
    pub provider: String,
    pub provider_configured: bool,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn index() -> &'static str {
    WELCOME_MESSAGE
}

async fn generate_question(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CompletionResult>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let body = match payload {
        Ok(Json(body)) => body,
        // Too large or interrupted: the prompt may well be there.
        Err(JsonRejection::BytesRejection(rejection)) => {
            let status = rejection.status();
            let message = rejection.body_text();
            state.metrics.observe_body_rejection(started.elapsed());
            warn!(
                request_id = request_id,
                status = status.as_u16(),
                reason = %message,
                "Request body could not be read"
            );
            return Err(ApiError::Body { status, message });
        }
        // Not JSON: no usable prompt.
        Err(rejection) => {
            debug!(
                request_id = request_id,
                reason = %rejection.body_text(),
                "Rejected request body"
            );
            Value::Null
        }
    };
    let request = GenerateRequest::from_json(&body);

    let outcome = state.relay.generate_question(request).await;
    state.metrics.observe(&outcome, started.elapsed());

    match &outcome {
        Ok(result) => {
            info!(
                request_id = request_id,
                content_len = result.content.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Question generated"
            );
            debug!(request_id = request_id, content = %result.content, "Completion content");
        }
        Err(e) => warn!(
            request_id = request_id,
            kind = e.kind(),
            error = %e,
            "Question generation failed"
        ),
    }

    outcome.map(Json).map_err(ApiError::from)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider = state.relay.provider();
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.relay.model().to_string(),
        provider: provider.name().to_string(),
        provider_configured: provider.is_configured(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
