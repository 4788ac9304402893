//! Error types for DocChat
//!
//! This module defines the crate-level error enum and the normalized
//! backend error shape, using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for DocChat operations
///
/// Covers configuration loading, backend construction, widget lookups and
/// JSON output of the CLI.
#[derive(Error, Debug)]
pub enum DocChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend construction or request errors
    #[error("Backend error: {0}")]
    Backend(String),

    /// A normalized API failure reported by the backend
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Session id unknown to the current session list
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// File id not present in the loaded folder tree
    #[error("Unknown file: {0}")]
    UnknownFile(String),

    /// Folder id not present in the loaded folder tree
    #[error("Unknown folder: {0}")]
    UnknownFolder(String),

    /// The chat store loop has stopped and no longer accepts actions
    #[error("Chat store is closed")]
    StoreClosed,

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Normalized failure of a backend request
///
/// Every backend rejection is reduced to this shape so the store can
/// reflect it into view state without caring about the transport.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code, if the failure came from a response
    pub status: Option<u16>,
    /// Human readable message
    pub message: String,
    /// Raw response body, when it was JSON
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Create an error without status or body
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            data: None,
        }
    }

    /// Normalize a non-success HTTP response
    ///
    /// A `message` field in the JSON body wins; otherwise a default text is
    /// chosen from the status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use docchat::error::ApiError;
    ///
    /// let err = ApiError::from_response(404, None);
    /// assert_eq!(err.status, Some(404));
    /// assert!(err.message.starts_with("Sorry!"));
    /// ```
    pub fn from_response(status: u16, data: Option<serde_json::Value>) -> Self {
        let body_message = data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string);

        let message = body_message.unwrap_or_else(|| {
            match status {
                500 => "Internal Server Error",
                401 => "Invalid credentials",
                403 | 404 => "Sorry! the data you are looking for could not be found",
                _ => "An error occurred",
            }
            .to_string()
        });

        Self {
            status: Some(status),
            message,
            data,
        }
    }

    /// Whether the backend rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: if message.is_empty() {
                "An error occurred".to_string()
            } else {
                message
            },
            data: None,
        }
    }
}

/// Result type alias for DocChat operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_error_display() {
        let error = DocChatError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_unknown_session_display() {
        let error = DocChatError::UnknownSession("42".to_string());
        assert_eq!(error.to_string(), "Unknown session: 42");
    }

    #[test]
    fn test_api_error_prefers_body_message() {
        let err = ApiError::from_response(500, Some(json!({"message": "model offline"})));
        assert_eq!(err.message, "model offline");
        assert_eq!(err.status, Some(500));
        assert!(err.data.is_some());
    }

    #[test]
    fn test_api_error_default_messages() {
        assert_eq!(
            ApiError::from_response(500, None).message,
            "Internal Server Error"
        );
        assert_eq!(
            ApiError::from_response(401, None).message,
            "Invalid credentials"
        );
        assert_eq!(
            ApiError::from_response(403, None).message,
            ApiError::from_response(404, None).message
        );
        assert_eq!(
            ApiError::from_response(418, Some(json!({"detail": "teapot"}))).message,
            "An error occurred"
        );
    }

    #[test]
    fn test_api_error_is_transparent_in_crate_error() {
        let err: DocChatError = ApiError::new("boom").into();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(ApiError::from_response(401, None).is_unauthorized());
        assert!(!ApiError::new("x").is_unauthorized());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: DocChatError = json_error.into();
        assert!(matches!(error, DocChatError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocChatError>();
        assert_send_sync::<ApiError>();
    }
}
