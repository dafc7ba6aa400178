//! Error types for apiflow
//!
//! Messages carry the method, endpoint and expected/actual values so a
//! failing test can be diagnosed from the report alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apiflow
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Invalid path '{0}': segments must be non-empty and dot-separated")]
    InvalidPath(String),

    // === Auth Errors ===
    #[error("Login failed{}: {body}", status_suffix(.status))]
    Auth { status: Option<u16>, body: String },

    // === Request Errors ===
    #[error("{method} {url}: network error: {message}")]
    Network {
        method: String,
        url: String,
        message: String,
    },

    #[error("{method} {endpoint}: HTTP {status}: {body}")]
    Http {
        method: String,
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{method} {endpoint}: expected {what} {expected}, got {actual}")]
    Assertion {
        method: String,
        endpoint: String,
        what: String,
        expected: String,
        actual: String,
    },

    // === Flow Errors ===
    #[error("Template error: {0}")]
    Template(String),

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with HTTP {code}"),
        None => String::new(),
    }
}

impl Error {
    /// Create a network error for a request
    pub fn network(method: &str, url: &str, message: impl ToString) -> Self {
        Self::Network {
            method: method.to_string(),
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an HTTP status error
    pub fn http(method: &str, endpoint: &str, status: u16, body: impl ToString) -> Self {
        Self::Http {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status,
            body: body.to_string(),
        }
    }

    /// Create an assertion failure naming what was compared
    pub fn assertion(
        method: &str,
        endpoint: &str,
        what: &str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::Assertion {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Config and auth failures abort the run: every later test depends on them
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } | Error::Auth { .. }
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Auth { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_names_both_values() {
        let err = Error::assertion("POST", "/users", "business code", 0, 1);
        assert_eq!(
            err.to_string(),
            "POST /users: expected business code 0, got 1"
        );
    }

    #[test]
    fn test_auth_message_includes_status() {
        let err = Error::Auth {
            status: Some(403),
            body: "denied".to_string(),
        };
        assert_eq!(err.to_string(), "Login failed with HTTP 403: denied");

        let err = Error::Auth {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Login failed: connection refused");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Config("missing".to_string()).is_fatal());
        assert!(Error::Auth {
            status: None,
            body: String::new()
        }
        .is_fatal());
        assert!(!Error::http("GET", "/x", 500, "").is_fatal());
        assert!(!Error::assertion("GET", "/x", "status", 200, 404).is_fatal());
    }
}
