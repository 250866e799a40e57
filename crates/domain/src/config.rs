//! Configuration structures
//!
//! These are the validated shapes handed to the core. Parsing and validation
//! of raw files lives in `linkguard-infra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_CONNECTION_TIMEOUT_SECONDS,
    DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS, DEFAULT_INITIAL_RECONNECT_DELAY_SECONDS,
    DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_MAX_RECONNECT_DELAY_SECONDS, STATE_TTL_SECONDS,
};
use crate::types::{ServiceType, SuppressionRule};

/// Retry and health-check tuning for one service connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub service_name: String,
    pub initial_reconnect_delay_seconds: f64,
    pub max_reconnect_delay_seconds: f64,
    pub backoff_multiplier: f64,
    pub max_consecutive_failures: u32,
    pub health_check_interval_seconds: u64,
    pub connection_timeout_seconds: u64,
}

impl ConnectionConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), ..Self::default() }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            initial_reconnect_delay_seconds: DEFAULT_INITIAL_RECONNECT_DELAY_SECONDS,
            max_reconnect_delay_seconds: DEFAULT_MAX_RECONNECT_DELAY_SECONDS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            health_check_interval_seconds: DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS,
            connection_timeout_seconds: DEFAULT_CONNECTION_TIMEOUT_SECONDS,
        }
    }
}

/// Shared connection-state store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// TTL applied to the state hash on every write.
    pub state_ttl_seconds: u64,
    /// SQLite file for a cross-process store; in-memory when absent.
    pub sqlite_path: Option<String>,
    pub pool_size: u32,
    /// Transport timeout for a single store operation.
    pub operation_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: STATE_TTL_SECONDS,
            sqlite_path: None,
            pool_size: 4,
            operation_timeout_seconds: 5,
        }
    }
}

/// Validated suppression configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionSettings {
    pub rule: SuppressionRule,
    pub service_type_mapping: BTreeMap<String, ServiceType>,
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub suppression: SuppressionSettings,
    pub store: StoreConfig,
    pub connections: Vec<ConnectionConfig>,
}

impl MonitorConfig {
    /// Connection settings for `service_name`, falling back to defaults.
    #[must_use]
    pub fn connection(&self, service_name: &str) -> ConnectionConfig {
        self.connections
            .iter()
            .find(|c| c.service_name == service_name)
            .cloned()
            .unwrap_or_else(|| ConnectionConfig::new(service_name))
    }
}
