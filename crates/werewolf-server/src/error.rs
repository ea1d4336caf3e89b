//! Error types for the HTTP API.
//!
//! [`ApiError`] converts into an Axum response carrying a JSON body of
//! the form `{"error": ..., "status": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required query parameter is missing or malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested session is unknown.
    #[error("not found: {0}")]
    NotFound(String),

    /// The session exists but may not be served yet.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
