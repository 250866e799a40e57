//! Connection state tracker
//!
//! Single entry point over the shared store: the retry/health layer writes
//! transitions through it and suppression decisions read through it. Store
//! failures of every kind come back as [`TrackerError`].

pub mod error;
pub mod timings;

use std::collections::HashMap;

use async_trait::async_trait;
use linkguard_domain::{ConnectionState, ConnectionStateInfo, ReconnectionEvent};
use tracing::{debug, info};

pub use self::error::{TrackerError, TrackerResult};
pub use self::timings::{compute_transition, TransitionEvent, TransitionTimings};
use crate::ports::ConnectionStateReader;
use crate::store::ConnectionStore;

/// High-level façade over [`ConnectionStore`].
pub struct ConnectionStateTracker {
    store: ConnectionStore,
}

impl ConnectionStateTracker {
    pub fn new(store: ConnectionStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    fn now(&self) -> f64 {
        self.store.clock().unix_seconds()
    }

    /// Records a transition for `service_name`.
    ///
    /// Returns the store's write result; a failed write is `Ok(false)` and
    /// logs no transition event.
    ///
    /// # Errors
    /// Failure to read the previous record or to append the transition event.
    pub async fn update_connection_state(
        &self,
        service_name: &str,
        new_state: ConnectionState,
        error_context: Option<String>,
        consecutive_failures: u32,
    ) -> TrackerResult<bool> {
        let existing = self
            .store
            .get_connection_state(service_name)
            .await
            .map_err(TrackerError::wrap("load previous connection state"))?;

        let now = self.now();
        let timings = compute_transition(existing.as_ref(), new_state, now);

        let record = ConnectionStateInfo::new(service_name, new_state, now)
            .with_error_context(error_context)
            .with_consecutive_failures(consecutive_failures)
            .with_timings(timings.reconnection_start_time, timings.last_successful_connection);

        let stored = self.store.store_connection_state(&record).await;

        if let Some(event) = timings.event.filter(|_| stored) {
            info!(
                service = service_name,
                event_type = event.event_type,
                details = %event.details,
                "reconnection_event"
            );
            self.store
                .record_reconnection_event(service_name, event.event_type, &event.details)
                .await
                .map_err(TrackerError::wrap("record reconnection event"))?;
        }

        debug!(
            service = service_name,
            state = %new_state,
            in_reconnection = record.in_reconnection,
            stored,
            "connection_state_updated"
        );
        Ok(stored)
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_connection_state(
        &self,
        service_name: &str,
    ) -> TrackerResult<Option<ConnectionStateInfo>> {
        self.store
            .get_connection_state(service_name)
            .await
            .map_err(TrackerError::wrap("get connection state"))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn is_service_in_reconnection(&self, service_name: &str) -> TrackerResult<bool> {
        self.store
            .is_service_in_reconnection(service_name)
            .await
            .map_err(TrackerError::wrap("check reconnection status"))
    }

    /// True while reconnecting, or within `grace_period_seconds` of the last
    /// successful connection.
    ///
    /// # Errors
    /// Store failures, wrapped.
    pub async fn is_service_in_grace_period(
        &self,
        service_name: &str,
        grace_period_seconds: u64,
    ) -> TrackerResult<bool> {
        let Some(info) = self.get_connection_state(service_name).await? else {
            return Ok(false);
        };
        if info.in_reconnection {
            return Ok(true);
        }
        Ok(info
            .last_successful_connection
            .is_some_and(|last| self.now() - last < seconds(grace_period_seconds)))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_services_in_reconnection(&self) -> TrackerResult<Vec<String>> {
        self.store
            .get_services_in_reconnection()
            .await
            .map_err(TrackerError::wrap("list services in reconnection"))
    }

    /// Seconds since the current reconnection began, or `None` when not
    /// reconnecting or no start time was recorded.
    ///
    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_reconnection_duration(&self, service_name: &str) -> TrackerResult<Option<f64>> {
        let Some(info) = self.get_connection_state(service_name).await? else {
            return Ok(None);
        };
        if !info.in_reconnection {
            return Ok(None);
        }
        Ok(info.reconnection_start_time.map(|started| self.now() - started))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_all_connection_states(
        &self,
    ) -> TrackerResult<HashMap<String, ConnectionStateInfo>> {
        self.store
            .get_all_connection_states()
            .await
            .map_err(TrackerError::wrap("get all connection states"))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn record_connection_event(
        &self,
        service_name: &str,
        event_type: &str,
        details: &str,
    ) -> TrackerResult<()> {
        self.store
            .record_reconnection_event(service_name, event_type, details)
            .await
            .map_err(TrackerError::wrap("record connection event"))
    }

    /// Publishes the opaque metrics blob for `service_name`.
    ///
    /// # Errors
    /// Store failures, wrapped.
    pub async fn store_service_metrics(
        &self,
        service_name: &str,
        metrics: &serde_json::Value,
    ) -> TrackerResult<()> {
        self.store
            .store_service_metrics(service_name, metrics)
            .await
            .map_err(TrackerError::wrap("store service metrics"))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_service_metrics(
        &self,
        service_name: &str,
    ) -> TrackerResult<Option<serde_json::Value>> {
        self.store
            .get_service_metrics(service_name)
            .await
            .map_err(TrackerError::wrap("get service metrics"))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn get_recent_connection_events(
        &self,
        service_name: &str,
        hours_back: u64,
    ) -> TrackerResult<Vec<ReconnectionEvent>> {
        self.store
            .get_recent_reconnection_events(service_name, hours_back)
            .await
            .map_err(TrackerError::wrap("get recent connection events"))
    }

    /// # Errors
    /// Store failures, wrapped.
    pub async fn cleanup_stale_states(&self, max_age_hours: u64) -> TrackerResult<usize> {
        self.store
            .cleanup_stale_states(max_age_hours)
            .await
            .map_err(TrackerError::wrap("clean up stale states"))
    }
}

#[async_trait]
impl ConnectionStateReader for ConnectionStateTracker {
    async fn get_connection_state(
        &self,
        service_name: &str,
    ) -> TrackerResult<Option<ConnectionStateInfo>> {
        Self::get_connection_state(self, service_name).await
    }

    async fn is_service_in_reconnection(&self, service_name: &str) -> TrackerResult<bool> {
        Self::is_service_in_reconnection(self, service_name).await
    }

    async fn is_service_in_grace_period(
        &self,
        service_name: &str,
        grace_period_seconds: u64,
    ) -> TrackerResult<bool> {
        Self::is_service_in_grace_period(self, service_name, grace_period_seconds).await
    }

    async fn get_reconnection_duration(&self, service_name: &str) -> TrackerResult<Option<f64>> {
        Self::get_reconnection_duration(self, service_name).await
    }

    fn now(&self) -> f64 {
        Self::now(self)
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(value: u64) -> f64 {
    value as f64
}
