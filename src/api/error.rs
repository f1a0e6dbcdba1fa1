//! Mapping of core errors onto HTTP responses
//!
//! Client errors carry their message. Server errors are logged in full and
//! answered with a generic body.

use crate::error::CoreError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

impl CoreError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) | CoreError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreError::NotFound(..) => StatusCode::NOT_FOUND,
            CoreError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed: {}", self);
            return (
                status,
                Json(serde_json::json!({ "error": "Server error" })),
            )
                .into_response();
        }

        if self.is_client_error() {
            tracing::debug!(status = %status, "Client error: {}", self);
        }

        match self {
            CoreError::RateLimited { retry_after_secs } => {
                let mut response = (
                    status,
                    Json(serde_json::json!({
                        "error": "Too many requests",
                        "retryAfter": retry_after_secs
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            other => (
                status,
                Json(serde_json::json!({ "error": other.to_string() })),
            )
                .into_response(),
        }
    }
}
