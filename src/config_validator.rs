use validator::Validate;

use crate::config::Config;
use crate::error::ApiError;

const VALID_ENVIRONMENTS: [&str; 4] = ["development", "staging", "production", "test"];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run every check against a loaded configuration
    pub fn validate_config(config: &Config) -> Result<(), ApiError> {
        config
            .validate()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        config
            .rate_limit_policy()
            .validate()
            .map_err(ApiError::Configuration)?;

        Self::validate_environment(&config.environment)?;
        Self::validate_log_level(&config.log_level)?;

        if config.bind_addr.port() == 0 {
            return Err(ApiError::Configuration(
                "Server port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates environment name
    pub fn validate_environment(env: &str) -> Result<(), ApiError> {
        if !VALID_ENVIRONMENTS.contains(&env.to_lowercase().as_str()) {
            return Err(ApiError::Configuration(format!(
                "Invalid environment '{}'. Must be one of: {:?}",
                env, VALID_ENVIRONMENTS
            )));
        }

        Ok(())
    }

    /// Validates the log level used when RUST_LOG is unset
    pub fn validate_log_level(level: &str) -> Result<(), ApiError> {
        if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ApiError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                level, VALID_LOG_LEVELS
            )));
        }

        Ok(())
    }
}
