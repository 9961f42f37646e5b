//! Error types for CaseDesk
//!
//! Every failure the client can see falls into one of three families:
//! - validation errors, raised before any network call
//! - network errors (transport failure, timeout)
//! - backend errors (non-2xx status, unreadable body)
//!
//! Errors are never fatal; the dashboard turns each into one banner string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NetworkError,
    BackendError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::NetworkError => 8001,
            ErrorCode::BackendError => 8002,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::InternalError => 9001,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unreadable backend response: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Network { .. } => ErrorCode::NetworkError,
            AppError::Backend { .. } | AppError::Decode { .. } => ErrorCode::BackendError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Io(_) | AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Raised locally, before any request left the process
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return AppError::Backend {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return AppError::Decode {
                message: err.to_string(),
            };
        }
        AppError::Network {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::Backend { status: 500, message: "boom".into() };
        assert_eq!(err.code(), ErrorCode::BackendError);
        assert!(!err.is_validation());

        let err = AppError::Decode { message: "eof".into() };
        assert_eq!(err.code(), ErrorCode::BackendError);
    }

    #[test]
    fn test_validation_error_displays_message_verbatim() {
        let err = AppError::validation("file", "Please select a file first.");
        assert_eq!(err.to_string(), "Please select a file first.");
        assert_eq!(err.code().as_code(), 1001);
        assert!(err.is_validation());
    }

    #[test]
    fn test_network_error() {
        let err = AppError::Network { message: "connection refused".into() };
        assert_eq!(err.code(), ErrorCode::NetworkError);
        assert!(!err.is_validation());
    }
}
