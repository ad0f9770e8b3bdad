use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::renderer::RenderError;
use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Rendering failed: {0}")]
    Rendering(#[from] RenderError),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation(_) | ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Rendering(_) | ApiError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body sent with every error status
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        match err {
            ApiError::RateLimitExceeded => Self::new(
                "Too many requests",
                "Rate limit exceeded. Please try again later.",
            ),
            ApiError::Validation(err) => Self::new(err.title(), &err.to_string()),
            ApiError::MalformedRequest(msg) => Self::new("Invalid request", msg),
            ApiError::MethodNotAllowed => Self::new(
                "Method not allowed",
                "Only GET and POST methods are supported",
            ),
            // Internal details stay in the logs
            ApiError::Rendering(_) | ApiError::Configuration(_) => {
                Self::new("Internal server error", "Failed to generate QR code")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (self.status(), Json(ErrorResponse::from_api_error(&self))).into_response()
    }
}
