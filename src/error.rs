//! Error types for tunefetch
//!
//! This module provides the crate-wide error handling, including:
//! - Domain-specific error types (database, task state machine)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Internal failures (database, I/O, serialization) are logged by the API layer and
//! reported to callers with a generic message only.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{TaskId, TaskStatus};

/// Result type alias for tunefetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tunefetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "tasks.job_timeout")
        key: Option<String>,
    },

    /// Malformed or unrecognized input (unsupported platform, missing field, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body exceeds the configured upload limit
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// No resolvable caller identity
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Referenced entity is absent or not owned by the caller
    #[error("{0} not found")]
    NotFound(String),

    /// Task state machine violation
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The acquisition tool failed to produce metadata or media
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Object storage rejected or failed the upload
    #[error("storage upload failed: {0}")]
    Storage(String),

    /// An acquisition job exceeded its time budget
    #[error("acquisition timed out after {secs}s")]
    Timeout {
        /// Budget that was exceeded, in seconds
        secs: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new submissions
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Operation not supported (missing binary, not configured, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A unique, foreign key or check constraint rejected the write
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Task lifecycle errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// The conditional update found the task in a different state than required
    #[error("cannot move task {id} to {to}: expected {expected}")]
    InvalidTransition {
        /// Task that rejected the transition
        id: TaskId,
        /// State the caller required the task to be in
        expected: String,
        /// Target state of the rejected transition
        to: TaskStatus,
    },

    /// Progress may not decrease while a task is processing
    #[error("progress of task {id} cannot move backwards to {progress}")]
    ProgressRegression {
        /// Task whose progress update was rejected
        id: TaskId,
        /// Rejected progress value
        progress: u8,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "unsupported platform: https://example.com/song"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
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
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,

            // 401 Unauthorized
            Error::Unauthenticated(_) => 401,

            // 413 Payload Too Large
            Error::PayloadTooLarge(_) => 413,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - task already past the requested state
            Error::Task(_) => 409,

            // 502 Bad Gateway - External collaborator errors
            Error::Acquisition(_) => 502,
            Error::Storage(_) => 502,
            Error::Network(_) => 502,

            // 504 Gateway Timeout
            Error::Timeout { .. } => 504,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 501 Not Implemented - Feature not supported
            Error::NotSupported(_) => 501,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Unauthenticated(_) => "unauthorized",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::NotFound(_) => "not_found",
            Error::Task(e) => match e {
                TaskError::InvalidTransition { .. } => "invalid_transition",
                TaskError::ProgressRegression { .. } => "progress_regression",
            },
            Error::Acquisition(_) => "acquisition_error",
            Error::Storage(_) => "storage_error",
            Error::Network(_) => "network_error",
            Error::Timeout { .. } => "timeout",
            Error::ShuttingDown => "shutting_down",
            Error::NotSupported(_) => "not_supported",
            Error::Database(_)
            | Error::Sqlx(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_) => "internal_error",
        }
    }
}

impl Error {
    /// Whether the message of this error is safe to show to API callers.
    ///
    /// Server-side failures keep their detail in the logs only.
    pub fn is_client_visible(&self) -> bool {
        self.status_code() < 500 || matches!(self, Error::ShuttingDown | Error::NotSupported(_))
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = if error.is_client_visible() {
            error.to_string()
        } else {
            "internal server error".to_string()
        };

        let details = match &error {
            Error::Task(TaskError::InvalidTransition { id, expected, to }) => {
                Some(serde_json::json!({
                    "task_id": id,
                    "expected": expected,
                    "to": to,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
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
