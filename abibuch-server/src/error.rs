//! Error types for abibuch-server
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": {"code": "...", "message": "..."}}` with a matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No valid session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409) - e.g. submission already locked
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Body exceeds the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unsupported upload content type (415)
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Student edits after the submission deadline (423)
    #[error("The submission deadline has passed")]
    DeadlinePassed,

    /// Admin mutation without a valid alias cookie (428)
    #[error("An admin alias is required for this action")]
    AliasRequired,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// sqlx error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// abibuch-common error
    #[error("Common error: {0}")]
    Common(#[from] abibuch_common::Error),
}

impl ApiError {
    /// HTTP status and stable machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            ApiError::DeadlinePassed => (StatusCode::LOCKED, "DEADLINE_PASSED"),
            ApiError::AliasRequired => (StatusCode::PRECONDITION_REQUIRED, "ALIAS_REQUIRED"),
            ApiError::Common(abibuch_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Csv(_)
            | ApiError::Other(_)
            | ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Common(abibuch_common::Error::InvalidInput(msg)) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("{} {}: {}", status.as_u16(), code, message);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
