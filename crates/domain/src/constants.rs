//! Domain constants
//!
//! Store key layout, retention windows and suppression defaults.

// Shared store layout
pub const CONNECTION_STATES_KEY: &str = "connection_states";
pub const RECONNECTION_EVENTS_KEY_PREFIX: &str = "reconnection_events";
pub const SERVICE_METRICS_KEY_PREFIX: &str = "service_metrics";

// Retention
pub const STATE_TTL_SECONDS: u64 = 24 * 60 * 60;
pub const DEFAULT_STALE_STATE_MAX_AGE_HOURS: u64 = 24;
pub const DEFAULT_EVENT_LOOKBACK_HOURS: u64 = 1;

// Suppression defaults
pub const DEFAULT_GRACE_PERIOD_SECONDS: u64 = 300;
pub const DEFAULT_MAX_SUPPRESSION_DURATION_SECONDS: u64 = 1800;
pub const DECISION_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_RECENT_DECISIONS_LIMIT: usize = 50;

// Connection defaults
pub const DEFAULT_INITIAL_RECONNECT_DELAY_SECONDS: f64 = 2.0;
pub const DEFAULT_MAX_RECONNECT_DELAY_SECONDS: f64 = 300.0;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_CONNECTION_TIMEOUT_SECONDS: u64 = 30;

/// Event type recorded when a service enters reconnection.
pub const EVENT_RECONNECTION_START: &str = "start";
/// Event type recorded when a service returns to `ready`.
pub const EVENT_RECONNECTION_SUCCESS: &str = "success";
