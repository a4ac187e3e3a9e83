//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Malformed chat/tip input is deliberately *not* an error: the session
//! manager treats it as a silent no-op.

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
///     "code": 2101,
///     "message": "session is not live: 4f1c...",
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
    /// Numeric error code (see code ranges on [`GatewayError`]).
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
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2099 | Not Found       | 404 Not Found                |
/// | 2100–2199 | State Conflict  | 409 Conflict                 |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Livestream session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Artist token with the given ID was not found.
    #[error("token not found: {0}")]
    TokenNotFound(uuid::Uuid),

    /// Session exists but is not currently live.
    #[error("session is not live: {0}")]
    SessionNotLive(uuid::Uuid),

    /// Session lifecycle transition is not allowed from the current status.
    #[error("invalid session transition: {0}")]
    InvalidTransition(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// The graduation commit sequence failed and was rolled back.
    #[error("graduation failed for token {token_id}: {reason}")]
    GraduationFailed {
        /// Token whose graduation was rolled back.
        token_id: uuid::Uuid,
        /// What went wrong during the commit sequence.
        reason: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::SessionNotFound(_) => 2001,
            Self::TokenNotFound(_) => 2002,
            Self::SessionNotLive(_) => 2101,
            Self::InvalidTransition(_) => 2102,
            Self::PersistenceError(_) => 3001,
            Self::GraduationFailed { .. } => 3002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) | Self::TokenNotFound(_) => StatusCode::NOT_FOUND,
            Self::SessionNotLive(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::GraduationFailed { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
