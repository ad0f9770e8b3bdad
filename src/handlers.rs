use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{ApiError, Result};
use crate::health::HealthStatus;
use crate::rate_limiter::RateLimiter;
use crate::renderer::QrRenderer;
use crate::response::ApiInfo;
use crate::validation::{RawGenerateParams, RequestValidator};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Application state containing the admission controller and dispatcher
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub dispatcher: Dispatcher,
    pub platform: String,
    pub environment: String,
}

impl AppState {
    pub fn new(limiter: Arc<RateLimiter>, dispatcher: Dispatcher) -> Self {
        Self {
            limiter,
            dispatcher,
            platform: "standalone".to_string(),
            environment: "development".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_policy())
            .with_max_entries(config.max_tracked_clients);

        Self {
            limiter: Arc::new(limiter),
            dispatcher: Dispatcher::new(Arc::new(QrRenderer)),
            platform: config.platform.clone(),
            environment: config.environment.clone(),
        }
    }
}

/// Generate a QR code from query parameters
pub async fn generate_get(
    State(state): State<SharedState>,
    query: std::result::Result<Query<RawGenerateParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = query.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;
    generate(&state, &params)
}

/// Generate a QR code from a JSON body
pub async fn generate_post(
    State(state): State<SharedState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let Json(body) = body.map_err(|e| ApiError::MalformedRequest(e.body_text()))?;
    let params = RawGenerateParams::from_json(&body)
        .ok_or_else(|| ApiError::MalformedRequest("Request body must be a JSON object".to_string()))?;
    generate(&state, &params)
}

fn generate(state: &AppState, params: &RawGenerateParams) -> Result<Response> {
    let request = RequestValidator::validate(params)?;

    tracing::debug!(
        format = %request.format(),
        size = request.size_px(),
        margin = request.margin_units(),
        payload_chars = request.payload().chars().count(),
        "Generating QR code"
    );

    Ok(state.dispatcher.dispatch(&request)?)
}

/// API description
pub async fn api_info(State(state): State<SharedState>) -> impl IntoResponse {
    Json(ApiInfo::new(&state.platform, state.limiter.policy()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthStatus::ok(&state.platform, &state.environment))
}

/// Bare OPTIONS requests get an empty 200
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
