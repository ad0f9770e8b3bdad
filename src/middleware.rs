use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client_key::ClientKey;
use crate::error::ApiError;
use crate::handlers::SharedState;
use crate::rate_limiter::Decision;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();

    info!(
        target: "qrgate::middleware",
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let status = response.status();
    info!(
        target: "qrgate::middleware",
        method = %method,
        uri = %uri,
        status = %status,
        request_id = %request_id,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

/// Quota check in front of QR generation.
///
/// Runs before the request body is read, so rejected callers never reach the
/// validator. OPTIONS requests pass through uncharged.
pub async fn admission_middleware(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = ClientKey::resolve(request.headers(), peer);
    let limit = state.limiter.policy().limit;

    match state.limiter.check(&key) {
        Decision::Admitted { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        Decision::Rejected { retry_after } => {
            let retry_after_secs = whole_seconds(retry_after);
            warn!(
                target: "qrgate::middleware",
                client = %key.short(),
                retry_after_secs,
                "Rate limit exceeded"
            );

            let mut response = ApiError::RateLimitExceeded.into_response();
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
            response
        }
    }
}

/// Round up to whole seconds, never below one
fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
