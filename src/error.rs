//! Error types for MessVerse

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Media host call failed
    #[error("Media host error: {0}")]
    Upstream(String),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Identifier is not well-formed for the store
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Validation error
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong API key
    #[error("Unauthorized")]
    Unauthorized,

    /// Client exceeded its request budget for the current window
    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Uploaded file exceeds the configured size limit
    #[error("File exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
}

/// Result type alias for Core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        CoreError::Upstream(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        CoreError::Api(format!("Blocking task failed: {}", e))
    }
}

impl CoreError {
    /// True for errors caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(..)
                | CoreError::InvalidIdentifier(_)
                | CoreError::Validation(_)
                | CoreError::Unauthorized
                | CoreError::RateLimited { .. }
                | CoreError::PayloadTooLarge(_)
        )
    }
}
