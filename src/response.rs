use serde::Serialize;
use serde_json::{json, Value};

use crate::format::OutputFormat;
use crate::rate_limit_config::RateLimitPolicy;
use crate::validation::{
    DEFAULT_MARGIN, DEFAULT_SIZE, MAX_MARGIN, MAX_PAYLOAD_CHARS, MAX_SIZE, MIN_SIZE,
};

/// Static description of the API served at `/api/qr/info`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub service: String,
    pub version: String,
    pub deployed_on: String,
    pub rate_limit: RateLimitPolicy,
    pub endpoints: Value,
}

impl ApiInfo {
    pub fn new(platform: &str, rate_limit: RateLimitPolicy) -> Self {
        let formats = OutputFormat::supported_list();

        Self {
            service: "QR Code Generator API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            deployed_on: platform.to_string(),
            rate_limit,
            endpoints: json!({
                "GET /api/qr/generate": {
                    "description": "Generate QR code using query parameters",
                    "parameters": {
                        "text": format!("Required. Text/URL to encode, at most {MAX_PAYLOAD_CHARS} characters"),
                        "size": format!("Optional. Size in pixels ({MIN_SIZE}-{MAX_SIZE}), default: {DEFAULT_SIZE}"),
                        "margin": format!("Optional. Margin size (0-{MAX_MARGIN}), default: {DEFAULT_MARGIN}"),
                        "format": format!("Optional. Output format ({formats}), default: png"),
                    },
                    "example": "/api/qr/generate?text=Hello%20World&size=200&margin=2&format=png",
                },
                "POST /api/qr/generate": {
                    "description": "Generate QR code with custom options",
                    "body": {
                        "text": "Required. Text/URL to encode",
                        "size": "Optional. Size in pixels",
                        "margin": "Optional. Margin size",
                        "format": "Optional. Output format",
                        "color": "Optional. QR code color (hex), default: #000000",
                        "background": "Optional. Background color (hex), default: #FFFFFF",
                    },
                },
                "GET /api/qr/info": {
                    "description": "Get API documentation",
                },
                "GET /api/health": {
                    "description": "Service health",
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_document_shape() {
        let info = serde_json::to_value(ApiInfo::new("standalone", RateLimitPolicy::default())).unwrap();

        assert_eq!(info["service"], "QR Code Generator API");
        assert_eq!(info["deployedOn"], "standalone");
        assert_eq!(info["rateLimit"]["limit"], 50);
        assert_eq!(info["rateLimit"]["window"], "15m");
        assert!(info["endpoints"]["GET /api/qr/generate"]["parameters"]["format"]
            .as_str()
            .unwrap()
            .contains("png, svg, pdf, eps"));
    }
}
