// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("No calendar tokens in session")]
    TokenMissing,

    #[error("Calendar authorization expired")]
    UpstreamAuthExpired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    OAuth(String),

    #[error("Calendar API error: {0}")]
    Upstream(String),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_required",
                Some("Authentication required".to_string()),
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "reauthentication_required",
                Some("No Google tokens available. Please re-authenticate.".to_string()),
            ),
            AppError::UpstreamAuthExpired => (
                StatusCode::UNAUTHORIZED,
                "reauthentication_required",
                Some("Google token expired. Please re-authenticate.".to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::OAuth(msg) => {
                tracing::error!(error = %msg, "Authentication error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "authentication_failed",
                    Some(msg.clone()),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Calendar API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    Some("Failed to fetch availability".to_string()),
                )
            }
            AppError::SessionStore(msg) => {
                tracing::error!(error = %msg, "Session store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "session_store_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
