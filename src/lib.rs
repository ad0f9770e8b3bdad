pub mod client_key;
pub mod clock;
pub mod color;
pub mod config;
pub mod config_validator;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod renderer;
pub mod response;
pub mod server;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, Result};
pub use rate_limiter::RateLimiter;
pub use server::create_app;
