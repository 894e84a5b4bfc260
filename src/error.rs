//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the error type returned by HTTP handlers. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! [`ChannelError`] describes a failed write to a single channel endpoint.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid command: expected value at line 1 column 1",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status     |
/// |-----------|-----------------|-----------------|
/// | 1000–1999 | Validation      | 400 Bad Request |
/// | 2000–2999 | Delivery        | 404 Not Found   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The command body could not be decoded.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// At least one recipient of a dispatched command could not be written to.
    #[error("delivery failed for {failed} of {attempted} endpoint(s)")]
    DeliveryFailed {
        /// Number of sends attempted.
        attempted: usize,
        /// Number of sends that failed.
        failed: usize,
    },
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidCommand(_) => 1001,
            Self::DeliveryFailed { .. } => 2001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            Self::DeliveryFailed { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::DeliveryFailed { .. } => {
                Some("failed endpoints were evicted from the registry".to_string())
            }
            Self::InvalidCommand(_) => None,
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidCommand(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// A write to a channel endpoint failed.
///
/// Either way the caller should treat the endpoint as dead and evict it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The endpoint's writer has stopped (transport failed or channel closed).
    #[error("channel closed")]
    Closed,

    /// The outbound queue stayed full for the whole send timeout.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}
