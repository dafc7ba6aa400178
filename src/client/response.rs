//! Parsed API responses

use serde_json::Value;
use std::time::Duration;

use crate::common::config::ResponseSettings;
use crate::store::path;

/// Maximum body characters quoted in error messages
const BODY_EXCERPT_CHARS: usize = 500;

/// A completed API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP method
    pub method: reqwest::Method,
    /// Endpoint as the caller wrote it
    pub endpoint: String,
    /// Fully resolved URL
    pub url: String,
    /// Transport status code
    pub status: u16,
    /// Parsed body; `Null` when empty, a JSON string when not JSON
    pub body: Value,
    /// Round-trip time of the final attempt
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Field at a dotted path in the body
    pub fn field(&self, key: &str) -> Option<&Value> {
        path::get_json(&self.body, key)
    }

    /// Business code of the envelope
    pub fn biz_code(&self, settings: &ResponseSettings) -> Option<&Value> {
        self.field(&settings.code_field)
    }

    /// Payload of the envelope
    pub fn data(&self, settings: &ResponseSettings) -> Option<&Value> {
        self.field(&settings.data_field)
    }

    /// Shortened body text for error messages
    pub fn body_excerpt(&self) -> String {
        let text = match &self.body {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        if text.chars().count() > BODY_EXCERPT_CHARS {
            let cut: String = text.chars().take(BODY_EXCERPT_CHARS).collect();
            format!("{}...", cut)
        } else {
            text
        }
    }
}

/// Parse a response body
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse {
            method: reqwest::Method::GET,
            endpoint: "/x".to_string(),
            url: "http://h/x".to_string(),
            status,
            body,
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_parse_body_variants() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body("{\"code\":0}"), json!({"code": 0}));
        assert_eq!(parse_body("plain text"), json!("plain text"));
    }

    #[test]
    fn test_envelope_accessors() {
        let settings = ResponseSettings::default();
        let r = response(200, json!({"code": 0, "data": {"id": 3}}));
        assert!(r.is_success());
        assert_eq!(r.biz_code(&settings), Some(&json!(0)));
        assert_eq!(r.data(&settings), Some(&json!({"id": 3})));
        assert_eq!(r.field("data.id"), Some(&json!(3)));
        assert!(!response(404, Value::Null).is_success());
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let long = "x".repeat(BODY_EXCERPT_CHARS + 10);
        let r = response(500, Value::String(long));
        let excerpt = r.body_excerpt();
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.len(), BODY_EXCERPT_CHARS + 3);
    }
}
