use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::color::Color;
use crate::format::OutputFormat;

pub const MAX_PAYLOAD_CHARS: usize = 1000;
pub const MIN_SIZE: u32 = 50;
pub const MAX_SIZE: u32 = 1000;
pub const MAX_MARGIN: u32 = 10;

pub const DEFAULT_SIZE: u32 = 200;
pub const DEFAULT_MARGIN: u32 = 1;

/// Reasons a generation request is refused. Checks run in declaration order
/// and the first failure is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The \"text\" parameter is required")]
    MissingParameter,
    #[error("Text must be at most {} characters", MAX_PAYLOAD_CHARS)]
    PayloadTooLong,
    #[error("Size must be between {} and {}", MIN_SIZE, MAX_SIZE)]
    InvalidSize,
    #[error("Margin must be between 0 and {}", MAX_MARGIN)]
    InvalidMargin,
    #[error("Supported formats: {}", OutputFormat::supported_list())]
    UnsupportedFormat,
    #[error("{field} must be a hex color such as #000000")]
    InvalidColor { field: &'static str },
}

impl ValidationError {
    /// Short machine-readable title used as the `error` field
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MissingParameter => "Missing required parameter",
            ValidationError::PayloadTooLong => "Text too long",
            ValidationError::InvalidSize => "Invalid size",
            ValidationError::InvalidMargin => "Invalid margin",
            ValidationError::UnsupportedFormat => "Unsupported format",
            ValidationError::InvalidColor { .. } => "Invalid color",
        }
    }
}

/// Unvalidated generation parameters as they arrive on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGenerateParams {
    pub text: Option<String>,
    pub size: Option<String>,
    pub margin: Option<String>,
    pub format: Option<String>,
    pub color: Option<String>,
    pub background: Option<String>,
}

impl RawGenerateParams {
    /// Read parameters from a JSON body. Numbers are accepted in place of
    /// strings for the options; `null` counts as absent. `text` must be a
    /// string, anything else is treated as missing. Returns `None` if the
    /// body is not an object.
    pub fn from_json(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let field = |name: &str| match object.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            text: object
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_owned),
            size: field("size"),
            margin: field("margin"),
            format: field("format"),
            color: field("color"),
            background: field("background"),
        })
    }
}

/// A request that passed every check. Only `RequestValidator` builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    payload: String,
    size_px: u32,
    margin_units: u32,
    format: OutputFormat,
    foreground: Option<Color>,
    background: Option<Color>,
}

impl GenerationRequest {
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    pub fn margin_units(&self) -> u32 {
        self.margin_units
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn foreground(&self) -> Option<Color> {
        self.foreground
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }
}

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    pub fn validate(raw: &RawGenerateParams) -> Result<GenerationRequest, ValidationError> {
        let payload = match raw.text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return Err(ValidationError::MissingParameter),
        };

        if payload.chars().count() > MAX_PAYLOAD_CHARS {
            return Err(ValidationError::PayloadTooLong);
        }

        let size_px = parse_in_range(raw.size.as_deref(), DEFAULT_SIZE, MIN_SIZE, MAX_SIZE)
            .ok_or(ValidationError::InvalidSize)?;

        let margin_units = parse_in_range(raw.margin.as_deref(), DEFAULT_MARGIN, 0, MAX_MARGIN)
            .ok_or(ValidationError::InvalidMargin)?;

        let format = match raw.format.as_deref() {
            None => OutputFormat::Png,
            Some(value) => value
                .parse()
                .map_err(|_| ValidationError::UnsupportedFormat)?,
        };

        let foreground = parse_color(raw.color.as_deref(), "color")?;
        let background = parse_color(raw.background.as_deref(), "background")?;

        Ok(GenerationRequest {
            payload: payload.to_string(),
            size_px,
            margin_units,
            format,
            foreground,
            background,
        })
    }
}

fn parse_in_range(value: Option<&str>, default: u32, min: u32, max: u32) -> Option<u32> {
    let Some(value) = value else {
        return Some(default);
    };

    let parsed: i64 = value.trim().parse().ok()?;
    if parsed < i64::from(min) || parsed > i64::from(max) {
        return None;
    }
    u32::try_from(parsed).ok()
}

fn parse_color(value: Option<&str>, field: &'static str) -> Result<Option<Color>, ValidationError> {
    match value {
        None => Ok(None),
        Some(value) => Color::parse_hex(value)
            .map(Some)
            .ok_or(ValidationError::InvalidColor { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(text: &str) -> RawGenerateParams {
        RawGenerateParams {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn with_size(size: &str) -> RawGenerateParams {
        RawGenerateParams {
            size: Some(size.to_string()),
            ..params("Hello")
        }
    }

    fn with_margin(margin: &str) -> RawGenerateParams {
        RawGenerateParams {
            margin: Some(margin.to_string()),
            ..params("Hello")
        }
    }

    #[test]
    fn test_defaults_applied() {
        let request = RequestValidator::validate(&params("Hello")).unwrap();
        assert_eq!(request.payload(), "Hello");
        assert_eq!(request.size_px(), 200);
        assert_eq!(request.margin_units(), 1);
        assert_eq!(request.format(), OutputFormat::Png);
        assert_eq!(request.foreground(), None);
        assert_eq!(request.background(), None);
    }

    #[test]
    fn test_missing_text_wins_over_other_failures() {
        let raw = RawGenerateParams {
            text: Some(String::new()),
            size: Some("5".to_string()),
            format: Some("gif".to_string()),
            ..Default::default()
        };
        assert_eq!(
            RequestValidator::validate(&raw),
            Err(ValidationError::MissingParameter)
        );
        assert_eq!(
            RequestValidator::validate(&RawGenerateParams::default()),
            Err(ValidationError::MissingParameter)
        );
    }

    #[test]
    fn test_payload_length_counts_characters() {
        assert!(RequestValidator::validate(&params(&"é".repeat(1000))).is_ok());
        assert_eq!(
            RequestValidator::validate(&params(&"a".repeat(1001))),
            Err(ValidationError::PayloadTooLong)
        );
    }

    #[test]
    fn test_size_range_is_inclusive() {
        assert_eq!(RequestValidator::validate(&with_size("50")).unwrap().size_px(), 50);
        assert_eq!(RequestValidator::validate(&with_size("1000")).unwrap().size_px(), 1000);

        for size in ["49", "1001", "-5", "abc", ""] {
            assert_eq!(
                RequestValidator::validate(&with_size(size)),
                Err(ValidationError::InvalidSize),
                "size {size:?}"
            );
        }
    }

    #[test]
    fn test_margin_range_is_inclusive() {
        assert_eq!(RequestValidator::validate(&with_margin("0")).unwrap().margin_units(), 0);
        assert_eq!(RequestValidator::validate(&with_margin("10")).unwrap().margin_units(), 10);

        for margin in ["-1", "11", "1.5"] {
            assert_eq!(
                RequestValidator::validate(&with_margin(margin)),
                Err(ValidationError::InvalidMargin),
                "margin {margin:?}"
            );
        }
    }

    #[test]
    fn test_size_checked_before_margin_and_format() {
        let raw = RawGenerateParams {
            size: Some("10".to_string()),
            margin: Some("99".to_string()),
            format: Some("gif".to_string()),
            ..params("Hello")
        };
        assert_eq!(RequestValidator::validate(&raw), Err(ValidationError::InvalidSize));
    }

    #[test]
    fn test_format_is_case_insensitive() {
        let raw = RawGenerateParams {
            format: Some("PNG".to_string()),
            ..params("Hello")
        };
        assert_eq!(RequestValidator::validate(&raw).unwrap().format(), OutputFormat::Png);

        let raw = RawGenerateParams {
            format: Some("bmp".to_string()),
            ..params("Hello")
        };
        assert_eq!(
            RequestValidator::validate(&raw),
            Err(ValidationError::UnsupportedFormat)
        );
    }

    #[test]
    fn test_colors_are_validated() {
        let raw = RawGenerateParams {
            color: Some("#FF0000".to_string()),
            background: Some("#fff".to_string()),
            ..params("Hello")
        };
        let request = RequestValidator::validate(&raw).unwrap();
        assert_eq!(request.foreground(), Some(Color::rgb(255, 0, 0)));
        assert_eq!(request.background(), Some(Color::WHITE));

        let raw = RawGenerateParams {
            background: Some("javascript:alert(1)".to_string()),
            ..params("Hello")
        };
        assert_eq!(
            RequestValidator::validate(&raw),
            Err(ValidationError::InvalidColor { field: "background" })
        );
    }

    #[test]
    fn test_from_json_accepts_numbers() {
        let body = json!({ "text": "Hello", "size": 300, "margin": "2", "format": "svg", "color": null });
        let raw = RawGenerateParams::from_json(&body).unwrap();
        assert_eq!(raw.size.as_deref(), Some("300"));
        assert_eq!(raw.margin.as_deref(), Some("2"));
        assert_eq!(raw.color, None);

        let request = RequestValidator::validate(&raw).unwrap();
        assert_eq!(request.size_px(), 300);
        assert_eq!(request.format(), OutputFormat::Svg);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(RawGenerateParams::from_json(&json!(["Hello"])).is_none());
        assert!(RawGenerateParams::from_json(&json!("Hello")).is_none());
    }

    #[test]
    fn test_non_string_text_is_missing() {
        for text in [json!(0), json!(false), json!({}), json!(["Hello"])] {
            let raw = RawGenerateParams::from_json(&json!({ "text": text })).unwrap();
            assert_eq!(raw.text, None);
            assert_eq!(
                RequestValidator::validate(&raw),
                Err(ValidationError::MissingParameter)
            );
        }
    }

    #[test]
    fn test_error_titles_and_messages() {
        assert_eq!(ValidationError::InvalidSize.title(), "Invalid size");
        assert_eq!(
            ValidationError::InvalidSize.to_string(),
            "Size must be between 50 and 1000"
        );
        assert_eq!(
            ValidationError::UnsupportedFormat.to_string(),
            "Supported formats: png, svg, pdf, eps"
        );
    }
}
