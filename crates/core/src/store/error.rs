//! Store error types

use std::time::Duration;

use linkguard_domain::LinkGuardError;
use thiserror::Error;

/// Failures raised by the shared connection-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A single backend operation exceeded its transport timeout.
    #[error("store operation '{operation}' timed out after {timeout:?}")]
    Timeout { operation: &'static str, timeout: Duration },

    /// A stored value was not valid JSON for the expected record.
    #[error("malformed record at {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Any other backend-reported failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for LinkGuardError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
