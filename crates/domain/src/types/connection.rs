//! Connection lifecycle types
//!
//! Timestamps are fractional seconds since the Unix epoch. They are written
//! by one process and read by others through the shared store, so the record
//! format is plain JSON with lowercase state names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::LinkGuardError;

/* -------------------------------------------------------------------------- */
/* Connection State */
/* -------------------------------------------------------------------------- */

/// Lifecycle state of one service connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    Ready,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Authenticating,
        Self::Authenticated,
        Self::Ready,
        Self::Reconnecting,
        Self::Failed,
    ];

    /// Whether the service counts as "in reconnection" in this state.
    #[must_use]
    pub const fn is_reconnection(self) -> bool {
        matches!(self, Self::Disconnected | Self::Connecting | Self::Reconnecting | Self::Failed)
    }

    /// `Ready` is the only fully operational state.
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = LinkGuardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| LinkGuardError::InvalidInput(format!("unknown connection state: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Persisted State Record */
/* -------------------------------------------------------------------------- */

/// Shared, persisted view of one service's connection state.
///
/// Records are overwritten as a whole on every update; `in_reconnection`
/// always mirrors [`ConnectionState::is_reconnection`] for records built
/// through [`ConnectionStateInfo::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStateInfo {
    pub service_name: String,
    pub state: ConnectionState,
    pub timestamp: f64,
    pub in_reconnection: bool,
    #[serde(default)]
    pub reconnection_start_time: Option<f64>,
    #[serde(default)]
    pub error_context: Option<String>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub last_successful_connection: Option<f64>,
}

impl ConnectionStateInfo {
    /// Record for `state` observed at `timestamp`, with no timing history.
    pub fn new(service_name: impl Into<String>, state: ConnectionState, timestamp: f64) -> Self {
        Self {
            service_name: service_name.into(),
            state,
            timestamp,
            in_reconnection: state.is_reconnection(),
            reconnection_start_time: None,
            error_context: None,
            consecutive_failures: 0,
            last_successful_connection: None,
        }
    }

    #[must_use]
    pub fn with_error_context(mut self, error_context: Option<String>) -> Self {
        self.error_context = error_context;
        self
    }

    #[must_use]
    pub fn with_consecutive_failures(mut self, consecutive_failures: u32) -> Self {
        self.consecutive_failures = consecutive_failures;
        self
    }

    #[must_use]
    pub fn with_timings(
        mut self,
        reconnection_start_time: Option<f64>,
        last_successful_connection: Option<f64>,
    ) -> Self {
        self.reconnection_start_time = reconnection_start_time;
        self.last_successful_connection = last_successful_connection;
        self
    }

    /// Structured representation used by the store.
    ///
    /// # Errors
    /// Returns `LinkGuardError::Internal` when a timestamp is not finite.
    pub fn to_value(&self) -> crate::Result<serde_json::Value> {
        let timestamps = [
            ("timestamp", Some(self.timestamp)),
            ("reconnection_start_time", self.reconnection_start_time),
            ("last_successful_connection", self.last_successful_connection),
        ];
        if let Some((field, _)) =
            timestamps.iter().find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        {
            return Err(LinkGuardError::Internal(format!(
                "cannot encode state record for {}: {field} is not finite",
                self.service_name
            )));
        }
        serde_json::to_value(self)
            .map_err(|e| LinkGuardError::Internal(format!("cannot encode state record: {e}")))
    }

    /// Rebuilds a record from [`ConnectionStateInfo::to_value`] output.
    ///
    /// # Errors
    /// Returns `LinkGuardError::InvalidInput` for unknown states or missing
    /// required fields.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| LinkGuardError::InvalidInput(format!("malformed state record: {e}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Local Metrics */
/* -------------------------------------------------------------------------- */

/// Per-service connection counters owned by the retry/health loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub successful_connections: u64,
    pub failed_connections: u64,
    pub consecutive_failures: u32,
    pub last_connection_time: Option<f64>,
    pub last_failure_time: Option<f64>,
    /// Most recent backoff delay in seconds.
    pub current_backoff_delay: f64,
    pub total_reconnection_attempts: u64,
}

/* -------------------------------------------------------------------------- */
/* Event Log */
/* -------------------------------------------------------------------------- */

/// Entry in a service's append-only reconnection event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectionEvent {
    pub service_name: String,
    pub event_type: String,
    #[serde(default)]
    pub details: String,
    pub timestamp: f64,
}
