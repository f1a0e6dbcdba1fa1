//! Authentication middleware for API key validation

use super::AppState;
use crate::error::CoreError;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "X-MV-KEY";

/// Authentication middleware
///
/// If `api_key` is configured in AppState, the request must carry the same
/// value in `X-MV-KEY`.
///
/// If no `api_key` is configured, all requests are allowed (open mode).
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_key) = &state.api_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    if key_matches(provided, expected_key) {
        next.run(request).await
    } else {
        tracing::warn!(
            path = %request.uri().path(),
            header_present = provided.is_some(),
            "Rejected request with missing or wrong API key"
        );
        CoreError::Unauthorized.into_response()
    }
}

fn key_matches(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(key) => constant_time_eq::constant_time_eq(key.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matching() {
        assert!(key_matches(Some("my-secret-key"), "my-secret-key"));
        assert!(!key_matches(Some("my-secret-kez"), "my-secret-key"));
        assert!(!key_matches(Some(""), "my-secret-key"));
        assert!(!key_matches(None, "my-secret-key"));
    }
}
