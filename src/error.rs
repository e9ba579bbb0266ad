//! Error types for ipfs-dl
//!
//! This module provides error handling for the library, including:
//! - The fatal error taxonomy (validation, storage, archive, configuration)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Per-item remote rejections and transport failures are not errors:
//! they are recorded as [`FetchOutcome`](crate::types::FetchOutcome) variants and
//! never escalate past the item that produced them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for ipfs-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ipfs-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "gateway.base_url")
        key: Option<String>,
    },

    /// Malformed download request (e.g., start greater than end)
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of the problem
        message: String,
        /// The request field that failed validation
        field: Option<String>,
    },

    /// Local storage fault: the storage area could not be created or written
    #[error("storage error at {path}: {source}")]
    Storage {
        /// The path that could not be created or written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (client construction, not per-item fetch failures)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No storage area or no eligible files to archive
    #[error("archive unavailable: {0}")]
    ArchiveUnavailable(String),

    /// ZIP archive construction failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a storage fault for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    /// Build a validation error for a request field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "validation error: start must be less than or equal to end",
///     "details": {
///       "field": "start"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "archive_unavailable", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation { .. } => 400,

            // 404 Not Found - nothing to archive is not a fault
            Error::ArchiveUnavailable(_) => 404,

            // 500 Internal Server Error - local environment issues
            Error::Storage { .. } => 500,
            Error::Io(_) => 500,
            Error::Archive(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation { .. } => "validation_error",
            Error::Storage { .. } => "storage_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ArchiveUnavailable(_) => "archive_unavailable",
            Error::Archive(_) => "archive_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({
                "field": field,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Storage { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
