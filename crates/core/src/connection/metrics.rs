//! Per-connection counters.

use std::sync::Arc;

use linkguard_common::time::Clock;
use linkguard_domain::ConnectionMetrics;
use parking_lot::Mutex;

/// Owns the [`ConnectionMetrics`] for one service.
///
/// Mutated only by the service's retry and health loops; everything else
/// reads snapshots.
pub struct MetricsTracker {
    metrics: Mutex<ConnectionMetrics>,
    clock: Arc<dyn Clock>,
}

impl MetricsTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { metrics: Mutex::new(ConnectionMetrics::default()), clock }
    }

    pub fn increment_total_connections(&self) {
        self.metrics.lock().total_connections += 1;
    }

    /// Successful connect: clears the failure streak and the backoff delay.
    pub fn record_success(&self) {
        let now = self.clock.unix_seconds();
        let mut metrics = self.metrics.lock();
        metrics.successful_connections += 1;
        metrics.consecutive_failures = 0;
        metrics.current_backoff_delay = 0.0;
        metrics.last_connection_time = Some(now);
    }

    /// Failed connect. Returns the new failure streak.
    pub fn record_failure(&self) -> u32 {
        let now = self.clock.unix_seconds();
        let mut metrics = self.metrics.lock();
        metrics.failed_connections += 1;
        metrics.consecutive_failures = metrics.consecutive_failures.saturating_add(1);
        metrics.last_failure_time = Some(now);
        metrics.consecutive_failures
    }

    pub fn record_reconnection_attempt(&self) {
        self.metrics.lock().total_reconnection_attempts += 1;
    }

    pub fn set_backoff_delay(&self, delay_seconds: f64) {
        self.metrics.lock().current_backoff_delay = delay_seconds;
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.metrics.lock().consecutive_failures
    }

    #[must_use]
    pub fn successful_connections(&self) -> u64 {
        self.metrics.lock().successful_connections
    }

    #[must_use]
    pub fn snapshot(&self) -> ConnectionMetrics {
        self.metrics.lock().clone()
    }
}
