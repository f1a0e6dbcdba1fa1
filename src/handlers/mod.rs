//! Business logic handlers
//!
//! These handlers orchestrate the media host and the database. The HTTP
//! layer only parses input and shapes responses around them.

pub mod memories;
pub mod portraits;

// Re-export commonly used types
pub use memories::*;
pub use portraits::*;

/// Trim a free-text field, treating blank input as absent
pub fn clean_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
