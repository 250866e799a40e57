//! Connection lifecycle errors

use std::time::Duration;

use linkguard_common::resilience::BackoffError;
use linkguard_domain::LinkGuardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The failure streak reached `max_consecutive_failures`. Not retried
    /// further; the owning process is expected to restart or alarm.
    #[error("{service}: giving up after {failures} consecutive connection failures")]
    RetriesExhausted { service: String, failures: u32 },

    /// Health checks themselves kept failing.
    #[error("{service}: health monitor failed {failures} times in a row: {source}")]
    HealthMonitor {
        service: String,
        failures: u32,
        #[source]
        source: LinkGuardError,
    },

    #[error("{service}: invalid backoff settings: {source}")]
    InvalidBackoff {
        service: String,
        #[source]
        source: BackoffError,
    },

    #[error("{0}: connection manager already running")]
    AlreadyRunning(String),

    #[error("{service}: {task} task did not stop within {timeout:?}")]
    ShutdownTimeout { service: String, task: &'static str, timeout: Duration },

    #[error("{service}: {task} task failed: {message}")]
    Join { service: String, task: &'static str, message: String },
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

impl From<ConnectionError> for LinkGuardError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::InvalidBackoff { .. } => Self::Config(err.to_string()),
            other => Self::Connection(other.to_string()),
        }
    }
}
