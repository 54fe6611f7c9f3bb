//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use guardian_core::RequestError;
use serde::Serialize;
use thiserror::Error;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is not a decodable moderation request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request decoded but cannot be moderated.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Moderation did not finish within the request timeout.
    #[error("moderation timed out after {0} ms")]
    Timeout(u64),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
