//! Port interfaces for the reliability core
//!
//! These traits define the boundaries between core business logic and the
//! storage, connection and alert-delivery implementations it drives.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use linkguard_domain::{ConnectionStateInfo, Result};

use crate::store::StoreResult;
use crate::tracker::TrackerResult;

/// Keyed storage primitives with TTL support.
///
/// The layout mirrors a Redis-style server: hashes for per-service records,
/// score-ordered sets for event logs, and plain values for metrics blobs.
/// Expired keys must behave as absent.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Set one field of the hash at `key`.
    async fn hash_set(&self, key: &str, field: &str, value: String) -> StoreResult<()>;

    /// Read one field of the hash at `key`.
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Read every field of the hash at `key`.
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Delete fields from the hash at `key`, returning how many existed.
    async fn hash_delete(&self, key: &str, fields: &[String]) -> StoreResult<usize>;

    /// Set `key` to expire after `ttl`. Returns `false` when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Add `member` to the score-ordered set at `key`.
    async fn sorted_add(&self, key: &str, score: f64, member: String) -> StoreResult<()>;

    /// Members with `min <= score <= max`, ordered by ascending score.
    async fn sorted_range_by_score(&self, key: &str, min: f64, max: f64)
        -> StoreResult<Vec<String>>;

    /// Remove members with `min <= score <= max`, returning how many went.
    async fn sorted_remove_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<usize>;

    /// Set a plain value, optionally with a TTL.
    async fn set_value(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()>;

    /// Read a plain value.
    async fn get_value(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Connection operations supplied by each concrete service client.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    /// Open the underlying connection. `Ok(false)` is an ordinary failure.
    async fn establish_connection(&self) -> Result<bool>;

    /// Liveness check on an established connection.
    ///
    /// `Ok(false)` means the connection is gone; `Err` means the check itself
    /// broke.
    async fn check_connection_health(&self) -> Result<bool>;

    /// Release resources on shutdown.
    async fn cleanup_connection(&self) -> Result<()> {
        Ok(())
    }
}

/// Human-facing connection notifications (chat channel, pager, log).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_connection_notification(
        &self,
        service_name: &str,
        is_connected: bool,
        details: &str,
    ) -> Result<()>;
}

/// Read side of the connection-state tracker used by suppression decisions.
#[async_trait]
pub trait ConnectionStateReader: Send + Sync {
    async fn get_connection_state(
        &self,
        service_name: &str,
    ) -> TrackerResult<Option<ConnectionStateInfo>>;

    async fn is_service_in_reconnection(&self, service_name: &str) -> TrackerResult<bool>;

    async fn is_service_in_grace_period(
        &self,
        service_name: &str,
        grace_period_seconds: u64,
    ) -> TrackerResult<bool>;

    async fn get_reconnection_duration(&self, service_name: &str) -> TrackerResult<Option<f64>>;

    /// Wall-clock time in Unix seconds, as seen by the tracker.
    fn now(&self) -> f64;
}
