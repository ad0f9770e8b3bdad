use crate::config::Config;
use crate::config_validator::ConfigValidator;
use crate::error::ApiError;
use crate::handlers::{
    api_info, generate_get, generate_post, health_check, method_not_allowed, preflight, AppState,
    SharedState,
};
use crate::middleware::{admission_middleware, logging_middleware};
use crate::rate_limiter::RateLimiter;
use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

const ALLOWED_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Build the router with all routes and layers
pub fn create_app(state: SharedState) -> Router {
    // Layered on the sub-router so the 405 fallback is charged as well
    let generate = Router::new()
        .route(
            "/api/qr/generate",
            get(generate_get)
                .post(generate_post)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ));

    // Allow-Methods and Allow-Headers are set on every response by the layers below
    let cors = CorsLayer::new().allow_origin(Any);

    Router::new()
        .merge(generate)
        .route(
            "/api/qr/info",
            get(api_info).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/api/health",
            get(health_check).options(preflight).fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(ALLOWED_METHODS),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOWED_HEADERS),
                ))
                .layer(cors)
                .layer(middleware::from_fn(logging_middleware)),
        )
}

/// Periodically drop expired windows so idle clients do not accumulate
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.sweep_expired();
            tracing::debug!(
                removed,
                tracked = limiter.tracked_clients(),
                "Background rate limit sweep"
            );
        }
    })
}

pub struct Server {
    app: Router,
    state: SharedState,
    bind_addr: SocketAddr,
    cleanup_interval: Duration,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        ConfigValidator::validate_config(&config)?;

        let state: SharedState = Arc::new(AppState::from_config(&config));
        let app = create_app(state.clone());

        Ok(Self {
            app,
            state,
            bind_addr: config.bind_addr,
            cleanup_interval: config.cleanup_interval(),
        })
    }

    pub async fn run(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        let policy = self.state.limiter.policy();

        tracing::info!("QR service listening on {}", self.bind_addr);
        tracing::info!(
            limit = policy.limit,
            window_secs = policy.window.as_secs(),
            "Rate limiting enabled"
        );
        tracing::info!("Health check available at /api/health");

        let sweeper = spawn_sweeper(self.state.limiter.clone(), self.cleanup_interval);

        // Run server with graceful shutdown
        let result = axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        sweeper.abort();
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
