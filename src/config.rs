use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use validator::Validate;

use crate::rate_limit_config::RateLimitPolicy;

#[derive(Debug, Clone, Parser, Validate)]
#[command(name = "qrgate", version, about = "QR code generation API")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// Requests admitted per client per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 50)]
    #[validate(range(min = 1))]
    pub rate_limit: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    #[validate(range(min = 1))]
    pub rate_window_secs: u64,

    /// Most client keys tracked at once
    #[arg(long, env = "MAX_TRACKED_CLIENTS", default_value_t = 100_000)]
    #[validate(range(min = 1))]
    pub max_tracked_clients: usize,

    /// Seconds between background sweeps of expired windows
    #[arg(long = "cleanup-interval", env = "CLEANUP_INTERVAL", default_value_t = 300)]
    #[validate(range(min = 1))]
    pub cleanup_interval_secs: u64,

    /// Hosting platform reported by the health endpoint
    #[arg(long, env = "PLATFORM", default_value = "standalone")]
    #[validate(length(min = 1))]
    pub platform: String,

    /// Deployment environment name
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// Log level for this crate when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from command line flags and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.rate_limit, Duration::from_secs(self.rate_window_secs))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "qrgate",
            "--bind-addr",
            "127.0.0.1:8080",
            "--rate-limit",
            "5",
            "--rate-window-secs",
            "60",
        ]);

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(
            config.rate_limit_policy(),
            RateLimitPolicy::new(5, Duration::from_secs(60))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limit_fails_validation() {
        let config = Config::parse_from(["qrgate", "--rate-limit", "0"]);
        assert!(config.validate().is_err());
    }
}
