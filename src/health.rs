use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "QR Code API";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub platform: String,
    pub environment: String,
}

impl HealthStatus {
    pub fn ok(platform: &str, environment: &str) -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: SERVICE_NAME.to_string(),
            platform: platform.to_string(),
            environment: environment.to_string(),
        }
    }
}
