//! Error types used throughout LinkGuard

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for LinkGuard
///
/// Layer-specific errors (store, tracker, connection, config) convert into
/// this type at crate boundaries.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LinkGuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Connection state tracker error: {0}")]
    Tracker(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for LinkGuard operations
pub type Result<T> = std::result::Result<T, LinkGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let err = LinkGuardError::Config("missing 'alert_suppression' section".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Config");
        assert_eq!(json["message"], "missing 'alert_suppression' section");
        assert_eq!(err.to_string(), "Configuration error: missing 'alert_suppression' section");
    }
}
