//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use binscan_core::BinscanError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - Operation clashes with existing data.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 422 Unprocessable Entity - Input parsed but is semantically invalid.
    UnprocessableEntity {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 424 Failed Dependency - The client has not supplied a location fix yet.
    FailedDependency {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<String>,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "location_unavailable",
    "message": "Current location is not available yet. Wait for a location fix and try again.",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "invalid_radius").
    #[schema(example = "location_unavailable")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Current location is not available yet. Wait for a location fix and try again.")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Conflict { error_code, message } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::UnprocessableEntity { error_code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::FailedDependency {
                error_code,
                message,
                details,
            } => (
                StatusCode::FAILED_DEPENDENCY,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: details.map(|d| serde_json::json!(d)),
                },
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::UnprocessableEntity { message, .. } => {
                write!(f, "Unprocessable Entity: {message}")
            }
            Self::FailedDependency { message, .. } => {
                write!(f, "Failed Dependency: {message}")
            }
            Self::InternalError { message, .. } => {
                write!(f, "Internal Error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from binscan_core errors, following the core's status mapping.
impl From<BinscanError> for ApiError {
    fn from(err: BinscanError) -> Self {
        let error_code = err.error_code().to_ascii_lowercase();
        let message = err.to_string();

        match err.http_status_code() {
            400 => Self::BadRequest { error_code, message },
            404 => Self::NotFound { error_code, message },
            409 => Self::Conflict { error_code, message },
            422 => Self::UnprocessableEntity { error_code, message },
            424 => Self::FailedDependency {
                error_code,
                message,
                details: Some(
                    "Send latitude and longitude once a position fix is available".to_string(),
                ),
            },
            _ => Self::InternalError {
                error_code,
                message,
                details: None,
            },
        }
    }
}
