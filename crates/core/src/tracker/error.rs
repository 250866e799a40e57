//! Tracker error type

use linkguard_domain::LinkGuardError;
use thiserror::Error;

use crate::store::StoreError;

/// Single error type surfaced by [`ConnectionStateTracker`](super::ConnectionStateTracker).
///
/// Wraps every store failure (connection, timeout, malformed JSON) so callers
/// never handle transport errors directly.
#[derive(Debug, Error)]
#[error("failed to {operation}: {source}")]
pub struct TrackerError {
    operation: &'static str,
    #[source]
    source: StoreError,
}

impl TrackerError {
    pub(crate) fn wrap(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self { operation, source }
    }

    /// The tracker operation that failed.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The underlying store failure.
    #[must_use]
    pub fn store_error(&self) -> &StoreError {
        &self.source
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

impl From<TrackerError> for LinkGuardError {
    fn from(err: TrackerError) -> Self {
        Self::Tracker(err.to_string())
    }
}
