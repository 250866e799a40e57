//! Shared connection-state store.
//!
//! Layout on the backend:
//! - `connection_states` hash: one JSON [`ConnectionStateInfo`] per service,
//!   TTL refreshed on every write.
//! - `reconnection_events:{service}` score-ordered set: JSON
//!   [`ReconnectionEvent`]s scored by timestamp.
//! - `service_metrics:{service}` value: opaque JSON metrics blob.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use linkguard_common::time::Clock;
use linkguard_domain::constants::{
    CONNECTION_STATES_KEY, RECONNECTION_EVENTS_KEY_PREFIX, SERVICE_METRICS_KEY_PREFIX,
    STATE_TTL_SECONDS,
};
use linkguard_domain::{ConnectionState, ConnectionStateInfo, ReconnectionEvent};
use tracing::{debug, error, info, warn};

use super::error::{StoreError, StoreResult};
use crate::ports::StateBackend;

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Whether a stored record counts as reconnecting for cross-process queries.
///
/// Broader than the persisted flag: `connecting` and `reconnecting` records
/// count even when `in_reconnection` is false (legacy writers).
#[must_use]
pub fn counts_as_reconnecting(info: &ConnectionStateInfo) -> bool {
    info.in_reconnection
        || matches!(info.state, ConnectionState::Reconnecting | ConnectionState::Connecting)
}

/// Durable, shared view of per-service connection state.
pub struct ConnectionStore {
    backend: Arc<dyn StateBackend>,
    clock: Arc<dyn Clock>,
    state_ttl: Duration,
    operation_timeout: Duration,
}

impl ConnectionStore {
    pub fn new(backend: Arc<dyn StateBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            state_ttl: Duration::from_secs(STATE_TTL_SECONDS),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_state_ttl(mut self, state_ttl: Duration) -> Self {
        self.state_ttl = state_ttl;
        self
    }

    #[must_use]
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn state_ttl(&self) -> Duration {
        self.state_ttl
    }

    /// Writes `info` under its service name and refreshes the hash TTL.
    ///
    /// Never errors: encoding and transport failures are logged and reported
    /// as `false`.
    pub async fn store_connection_state(&self, info: &ConnectionStateInfo) -> bool {
        let payload = match info.to_value() {
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!(service = %info.service_name, error = %e, "connection_state_encode_failed");
                return false;
            }
        };

        let result = async {
            self.timed(
                "hash_set",
                self.backend.hash_set(CONNECTION_STATES_KEY, &info.service_name, payload),
            )
            .await?;
            self.timed("expire", self.backend.expire(CONNECTION_STATES_KEY, self.state_ttl))
                .await?;
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                debug!(
                    service = %info.service_name,
                    state = %info.state,
                    in_reconnection = info.in_reconnection,
                    "connection_state_stored"
                );
                true
            }
            Err(e) => {
                error!(service = %info.service_name, error = %e, "connection_state_store_failed");
                false
            }
        }
    }

    /// Current record for `service_name`, if any.
    ///
    /// # Errors
    /// Transport failures and malformed records.
    pub async fn get_connection_state(
        &self,
        service_name: &str,
    ) -> StoreResult<Option<ConnectionStateInfo>> {
        let raw = self
            .timed("hash_get", self.backend.hash_get(CONNECTION_STATES_KEY, service_name))
            .await?;
        raw.map(|payload| decode_state(service_name, &payload)).transpose()
    }

    /// Every stored record keyed by service name.
    ///
    /// Records that fail to decode are skipped with a warning; the stale sweep
    /// removes them.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn get_all_connection_states(
        &self,
    ) -> StoreResult<HashMap<String, ConnectionStateInfo>> {
        let raw = self.timed("hash_get_all", self.backend.hash_get_all(CONNECTION_STATES_KEY)).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(service, payload)| match decode_state(&service, &payload) {
                Ok(info) => Some((service, info)),
                Err(e) => {
                    warn!(service = %service, error = %e, "connection_state_decode_failed");
                    None
                }
            })
            .collect())
    }

    /// # Errors
    /// Transport failures and malformed records.
    pub async fn is_service_in_reconnection(&self, service_name: &str) -> StoreResult<bool> {
        Ok(self.get_connection_state(service_name).await?.is_some_and(|info| counts_as_reconnecting(&info)))
    }

    /// Names of all reconnecting services, sorted.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn get_services_in_reconnection(&self) -> StoreResult<Vec<String>> {
        let mut services: Vec<String> = self
            .get_all_connection_states()
            .await?
            .into_iter()
            .filter(|(_, info)| counts_as_reconnecting(info))
            .map(|(service, _)| service)
            .collect();
        services.sort();
        Ok(services)
    }

    /// Appends an event to the service's log and prunes entries older than
    /// the state TTL.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn record_reconnection_event(
        &self,
        service_name: &str,
        event_type: &str,
        details: &str,
    ) -> StoreResult<()> {
        let key = events_key(service_name);
        let now = self.clock.unix_seconds();
        let event = ReconnectionEvent {
            service_name: service_name.to_string(),
            event_type: event_type.to_string(),
            details: details.to_string(),
            timestamp: now,
        };
        let member = serde_json::to_string(&event)
            .map_err(|source| StoreError::Serialization { key: key.clone(), source })?;

        self.timed("sorted_add", self.backend.sorted_add(&key, now, member)).await?;
        let horizon = now - self.state_ttl.as_secs_f64();
        let pruned = self
            .timed(
                "sorted_remove_by_score",
                self.backend.sorted_remove_by_score(&key, f64::NEG_INFINITY, horizon),
            )
            .await?;
        self.timed("expire", self.backend.expire(&key, self.state_ttl)).await?;

        debug!(service = service_name, event_type, pruned, "reconnection_event_recorded");
        Ok(())
    }

    /// Events from the last `hours_back` hours, oldest first.
    ///
    /// Entries that fail to decode are skipped with a warning.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn get_recent_reconnection_events(
        &self,
        service_name: &str,
        hours_back: u64,
    ) -> StoreResult<Vec<ReconnectionEvent>> {
        let key = events_key(service_name);
        let since = self.clock.unix_seconds() - hours_to_seconds(hours_back);
        let members = self
            .timed(
                "sorted_range_by_score",
                self.backend.sorted_range_by_score(&key, since, f64::INFINITY),
            )
            .await?;

        Ok(members
            .into_iter()
            .filter_map(|member| match serde_json::from_str::<ReconnectionEvent>(&member) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(service = service_name, error = %e, "reconnection_event_decode_failed");
                    None
                }
            })
            .collect())
    }

    /// Replaces the opaque metrics blob for `service_name`.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn store_service_metrics(
        &self,
        service_name: &str,
        metrics: &serde_json::Value,
    ) -> StoreResult<()> {
        let key = metrics_key(service_name);
        let payload = serde_json::to_string(metrics)
            .map_err(|source| StoreError::Serialization { key: key.clone(), source })?;
        self.timed("set_value", self.backend.set_value(&key, payload, Some(self.state_ttl))).await
    }

    /// # Errors
    /// Transport failures and malformed blobs.
    pub async fn get_service_metrics(
        &self,
        service_name: &str,
    ) -> StoreResult<Option<serde_json::Value>> {
        let key = metrics_key(service_name);
        let raw = self.timed("get_value", self.backend.get_value(&key)).await?;
        raw.map(|payload| {
            serde_json::from_str(&payload)
                .map_err(|source| StoreError::Serialization { key: key.clone(), source })
        })
        .transpose()
    }

    /// Deletes records whose timestamp is older than `max_age_hours`.
    ///
    /// Undecodable records are treated as stale. Returns how many fields were
    /// removed.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn cleanup_stale_states(&self, max_age_hours: u64) -> StoreResult<usize> {
        let cutoff = self.clock.unix_seconds() - hours_to_seconds(max_age_hours);
        let raw = self.timed("hash_get_all", self.backend.hash_get_all(CONNECTION_STATES_KEY)).await?;

        let stale: Vec<String> = raw
            .into_iter()
            .filter(|(service, payload)| match decode_state(service, payload) {
                Ok(info) => info.timestamp < cutoff,
                Err(e) => {
                    warn!(service = %service, error = %e, "discarding_malformed_state");
                    true
                }
            })
            .map(|(service, _)| service)
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let removed = self
            .timed("hash_delete", self.backend.hash_delete(CONNECTION_STATES_KEY, &stale))
            .await?;
        info!(removed, max_age_hours, "stale_connection_states_removed");
        Ok(removed)
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout { operation, timeout: self.operation_timeout })?
    }
}

fn decode_state(service_name: &str, payload: &str) -> StoreResult<ConnectionStateInfo> {
    serde_json::from_str(payload).map_err(|source| StoreError::Serialization {
        key: format!("{CONNECTION_STATES_KEY}:{service_name}"),
        source,
    })
}

fn events_key(service_name: &str) -> String {
    format!("{RECONNECTION_EVENTS_KEY_PREFIX}:{service_name}")
}

fn metrics_key(service_name: &str) -> String {
    format!("{SERVICE_METRICS_KEY_PREFIX}:{service_name}")
}

#[allow(clippy::cast_precision_loss)]
fn hours_to_seconds(hours: u64) -> f64 {
    hours as f64 * SECONDS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use linkguard_common::time::MockClock;
    use serde_json::json;

    use super::*;
    use crate::testing::MemoryBackend;

    const T0: f64 = 1_700_000_000.0;

    fn store_with(backend: &Arc<MemoryBackend>, clock: &MockClock) -> ConnectionStore {
        ConnectionStore::new(Arc::clone(backend) as Arc<dyn StateBackend>, Arc::new(clock.clone()))
    }

    fn record(service: &str, state: ConnectionState, timestamp: f64) -> ConnectionStateInfo {
        ConnectionStateInfo::new(service, state, timestamp)
    }

    /// Validates a write lands in the shared hash and refreshes the TTL.
    ///
    /// Assertions:
    /// - The write reports success.
    /// - The record reads back unchanged.
    /// - The state hash TTL is 24 hours.
    #[tokio::test]
    async fn stores_and_reads_back_state() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        let info = record("kalshi", ConnectionState::Ready, T0);
        assert!(store.store_connection_state(&info).await);

        assert_eq!(store.get_connection_state("kalshi").await.unwrap(), Some(info));
        assert_eq!(store.get_connection_state("deribit").await.unwrap(), None);
        assert_eq!(backend.ttl_of(CONNECTION_STATES_KEY), Some(Duration::from_secs(86_400)));
    }

    #[tokio::test]
    async fn unencodable_record_reports_false() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        assert!(!store.store_connection_state(&record("kalshi", ConnectionState::Ready, f64::NAN)).await);
        assert_eq!(store.get_connection_state("kalshi").await.unwrap(), None);
    }

    #[tokio::test]
    async fn transport_failure_reports_false() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        backend.set_failing(true);
        assert!(!store.store_connection_state(&record("kalshi", ConnectionState::Ready, T0)).await);
        assert!(store.get_connection_state("kalshi").await.is_err());
    }

    /// Validates the broadened reconnection check.
    ///
    /// Assertions:
    /// - A `connecting` record with a false flag still counts.
    /// - `failed` counts through the flag.
    /// - `ready` does not count.
    #[tokio::test]
    async fn reconnection_queries_use_broadened_check() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        let mut legacy = record("weather", ConnectionState::Connecting, T0);
        legacy.in_reconnection = false;
        store.store_connection_state(&legacy).await;
        store.store_connection_state(&record("deribit", ConnectionState::Failed, T0)).await;
        store.store_connection_state(&record("kalshi", ConnectionState::Ready, T0)).await;

        assert!(store.is_service_in_reconnection("weather").await.unwrap());
        assert!(store.is_service_in_reconnection("deribit").await.unwrap());
        assert!(!store.is_service_in_reconnection("kalshi").await.unwrap());
        assert!(!store.is_service_in_reconnection("missing").await.unwrap());
        assert_eq!(
            store.get_services_in_reconnection().await.unwrap(),
            vec!["deribit".to_string(), "weather".to_string()]
        );
    }

    #[tokio::test]
    async fn malformed_record_surfaces_serialization_error() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        backend
            .hash_set(CONNECTION_STATES_KEY, "cfb", "{not json".to_string())
            .await
            .unwrap();

        let err = store.get_connection_state("cfb").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    /// Validates one bad field does not hide the rest of the fleet.
    ///
    /// Assertions:
    /// - The decodable record is returned, the bad one is skipped.
    /// - Reconnection listing still works.
    #[tokio::test]
    async fn fleet_read_skips_undecodable_records() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        store.store_connection_state(&record("good", ConnectionState::Reconnecting, T0)).await;
        backend.hash_set(CONNECTION_STATES_KEY, "bad", "not-json".to_string()).await.unwrap();

        let all = store.get_all_connection_states().await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["good"]);
        assert_eq!(store.get_services_in_reconnection().await.unwrap(), vec!["good".to_string()]);
    }

    /// Validates the event log lookback window.
    ///
    /// Assertions:
    /// - Events older than the window are excluded.
    /// - Results are ordered oldest first.
    #[tokio::test]
    async fn event_log_respects_lookback() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        store.record_reconnection_event("kalshi", "start", "Entering reconnection from ready").await.unwrap();
        clock.advance_secs(2.0 * 3600.0);
        store.record_reconnection_event("kalshi", "success", "Reconnection successful").await.unwrap();
        clock.advance_secs(60.0);
        store.record_reconnection_event("kalshi", "start", "Entering reconnection from ready").await.unwrap();

        let recent = store.get_recent_reconnection_events("kalshi", 1).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, "success");
        assert_eq!(recent[1].event_type, "start");

        let all = store.get_recent_reconnection_events("kalshi", 24).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(store.get_recent_reconnection_events("deribit", 24).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metrics_blob_round_trips() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        let blob = json!({"successful_connections": 4, "consecutive_failures": 0});
        store.store_service_metrics("tracker", &blob).await.unwrap();

        assert_eq!(store.get_service_metrics("tracker").await.unwrap(), Some(blob));
        assert_eq!(store.get_service_metrics("cfb").await.unwrap(), None);
    }

    /// Validates the stale sweep.
    ///
    /// Assertions:
    /// - Records older than the cutoff and malformed records are removed.
    /// - Fresh records survive.
    #[tokio::test]
    async fn cleanup_removes_stale_and_malformed() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock);

        store.store_connection_state(&record("old", ConnectionState::Ready, T0 - 30.0 * 3600.0)).await;
        store.store_connection_state(&record("fresh", ConnectionState::Ready, T0 - 60.0)).await;
        backend.hash_set(CONNECTION_STATES_KEY, "junk", "[]".to_string()).await.unwrap();

        assert_eq!(store.cleanup_stale_states(24).await.unwrap(), 2);
        let remaining = store.get_all_connection_states().await.unwrap();
        assert_eq!(remaining.keys().collect::<Vec<_>>(), vec!["fresh"]);
        assert_eq!(store.cleanup_stale_states(24).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = MockClock::at_unix(T0);
        let store = store_with(&backend, &clock).with_operation_timeout(Duration::from_millis(50));

        backend.set_latency(Duration::from_secs(1));
        let err = store.get_connection_state("kalshi").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "hash_get", .. }));
    }
}
