use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Requests admitted per client before rejection
pub const DEFAULT_LIMIT: u32 = 50;

/// Length of one accounting window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Quota applied to every client key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub limit: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Validate policy parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("Rate limit window must be greater than 0".to_string());
        }
        Ok(())
    }
}
