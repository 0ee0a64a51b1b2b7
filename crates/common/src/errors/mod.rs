//! Error types for SynthesisTalk services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Transient-failure classification for provider retries

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    PayloadTooLarge,

    // Input rejected (2xxx)
    UnsupportedDocumentType,
    EmptyDocument,

    // Resource errors (4xxx)
    NotFound,
    ConversationNotFound,
    DocumentNotFound,

    // External provider errors (8xxx)
    ProviderUnavailable,
    ProviderFailure,
    ProviderTimeout,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            // Input (2xxx)
            ErrorCode::UnsupportedDocumentType => 2001,
            ErrorCode::EmptyDocument => 2002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ConversationNotFound => 4002,
            ErrorCode::DocumentNotFound => 4003,

            // External (8xxx)
            ErrorCode::ProviderUnavailable => 8001,
            ErrorCode::ProviderFailure => 8002,
            ErrorCode::ProviderTimeout => 8003,
            ErrorCode::UpstreamError => 8004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    // Input rejected
    #[error("Unsupported file type '{content_type}'. Only PDF and text files are supported.")]
    UnsupportedDocumentType { content_type: String },

    #[error("No text content found in the document '{filename}'")]
    EmptyDocument { filename: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // External provider errors
    #[error("Provider unavailable: {provider} ({message})")]
    ProviderUnavailable { provider: String, message: String },

    #[error("{provider} call failed: {message}")]
    ProviderFailure { provider: String, message: String },

    #[error("{provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("{provider} returned HTTP {status}: {body}")]
    UpstreamStatus { provider: String, status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::UnsupportedDocumentType { .. } => ErrorCode::UnsupportedDocumentType,
            AppError::EmptyDocument { .. } => ErrorCode::EmptyDocument,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ConversationNotFound { .. } => ErrorCode::ConversationNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            AppError::ProviderFailure { .. } => ErrorCode::ProviderFailure,
            AppError::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingField { .. } |
            AppError::InvalidFormat { .. } |
            AppError::UnsupportedDocumentType { .. } |
            AppError::EmptyDocument { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::ConversationNotFound { .. } |
            AppError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::ProviderFailure { .. } |
            AppError::UpstreamStatus { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::ProviderUnavailable { .. } |
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            AppError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Whether a provider call that failed with this error may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::ProviderTimeout { .. } => true,
            AppError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            AppError::HttpClient(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ConversationNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::ConversationNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_input_rejected_is_client_error() {
        let err = AppError::UnsupportedDocumentType {
            content_type: "image/png".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());

        let err = AppError::EmptyDocument { filename: "blank.txt".into() };
        assert_eq!(err.code().as_code(), 2002);
    }

    #[test]
    fn test_provider_errors() {
        let err = AppError::ProviderUnavailable {
            provider: "groq".into(),
            message: "GROQ_API_KEY is not set".into(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.is_transient());

        let err = AppError::ProviderTimeout { provider: "groq".into(), timeout_ms: 30_000 };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.is_transient());
    }

    #[test]
    fn test_upstream_status_transience() {
        let throttled = AppError::UpstreamStatus {
            provider: "brave".into(),
            status: 429,
            body: String::new(),
        };
        let bad_request = AppError::UpstreamStatus {
            provider: "brave".into(),
            status: 400,
            body: String::new(),
        };
        let outage = AppError::UpstreamStatus {
            provider: "brave".into(),
            status: 503,
            body: String::new(),
        };
        assert!(throttled.is_transient());
        assert!(!bad_request.is_transient());
        assert!(outage.is_transient());
    }
}
