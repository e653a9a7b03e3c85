//! Client error types.

use std::collections::BTreeMap;

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body did not match the expected schema.
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The server rejected the credentials (401).
    ///
    /// By the time the caller sees this, the session handle has already
    /// been told about the rejection.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The server rejected the request payload.
    #[error("Validation failed ({status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Summary message from the server.
        message: String,
        /// Per-field error messages.
        errors: BTreeMap<String, Vec<String>>,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server returned any other error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Response parsed but did not report success.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Unauthorized(_)) || matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this is a validation error carrying field messages.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Check if this is a transient network failure (timeout, connectivity loss).
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Field errors for a validation failure.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            Error::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the server.
///
/// The API is inconsistent about where it puts the human message, so both
/// `message` and `error` are accepted.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ErrorResponse {
    /// Pick the most specific message, falling back to `default`.
    pub(crate) fn message_or(&self, default: &str) -> String {
        let non_empty = |m: &&str| !m.is_empty();
        self.message
            .as_deref()
            .filter(non_empty)
            .or(self.error.as_deref().filter(non_empty))
            .unwrap_or(default)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_message_over_error() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"message":"Invalid credentials","error":"auth"}"#).unwrap();
        assert_eq!(body.message_or("x"), "Invalid credentials");

        let body: ErrorResponse = serde_json::from_str(r#"{"error":"Token expired"}"#).unwrap();
        assert_eq!(body.message_or("x"), "Token expired");

        let body: ErrorResponse = serde_json::from_str(r#"{"message":""}"#).unwrap();
        assert_eq!(body.message_or("HTTP 400"), "HTTP 400");
    }

    #[test]
    fn test_predicates() {
        assert!(Error::Unauthorized("no".into()).is_auth_error());
        assert!(Error::Api { status: 401, message: String::new() }.is_auth_error());
        assert!(Error::Api { status: 503, message: String::new() }.is_server_error());
        assert!(Error::NotFound("group".into()).is_not_found());

        let validation = Error::Validation {
            status: 422,
            message: "The given data was invalid.".into(),
            errors: BTreeMap::from([("email".to_string(), vec!["taken".to_string()])]),
        };
        assert!(validation.is_validation_error());
        assert!(!validation.is_auth_error());
        assert_eq!(validation.field_errors().unwrap()["email"], vec!["taken"]);
    }
}
