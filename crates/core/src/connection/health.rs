//! Periodic health checks with reconnection hand-off.
//!
//! Each tick looks at the local state:
//! - `ready`: probe the connection; a negative probe moves the service to
//!   `disconnected` and starts a reconnection task.
//! - `disconnected`: start a reconnection task if none is running.
//! - anything else: a reconnection is already in flight, do nothing.
//!
//! Errors raised by the probe itself are counted separately from connection
//! failures. The monitor tolerates `max_consecutive_failures - 1` of them in
//! a row, then gives up with the last error.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linkguard_domain::{ConnectionState, LinkGuardError};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{ConnectionError, ConnectionResult};
use super::retry::{ConnectOutcome, RetryCoordinator};
use super::state::LocalConnectionState;
use crate::ports::ConnectionProbe;

type ReconnectionTask = JoinHandle<ConnectionResult<ConnectOutcome>>;

/// Health-check loop for one service.
pub struct HealthMonitor {
    service_name: String,
    interval: Duration,
    max_consecutive_failures: u32,
    state: Arc<LocalConnectionState>,
    probe: Arc<dyn ConnectionProbe>,
    coordinator: Arc<RetryCoordinator>,
    failures: AtomicU32,
    reconnection: Mutex<Option<ReconnectionTask>>,
}

impl HealthMonitor {
    pub fn new(
        state: Arc<LocalConnectionState>,
        probe: Arc<dyn ConnectionProbe>,
        coordinator: Arc<RetryCoordinator>,
        interval: Duration,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            service_name: state.service_name().to_string(),
            interval,
            max_consecutive_failures,
            state,
            probe,
            coordinator,
            failures: AtomicU32::new(0),
            reconnection: Mutex::new(None),
        }
    }

    /// Consecutive errors raised by the health probe itself.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn reconnection_running(&self) -> bool {
        self.reconnection.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Detaches the reconnection task so the caller can await it on shutdown.
    pub fn take_reconnection_task(&self) -> Option<ReconnectionTask> {
        self.reconnection.lock().take()
    }

    /// Runs until `cancel` fires or a fatal error occurs.
    ///
    /// # Errors
    /// - [`ConnectionError::HealthMonitor`] after too many probe errors in a row
    /// - [`ConnectionError::RetriesExhausted`] from a reconnection task
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> ConnectionResult<()> {
        info!(
            service = %self.service_name,
            interval_secs = self.interval.as_secs_f64(),
            "health_monitor_started"
        );

        loop {
            if !self.sleep_interval(&cancel).await {
                break;
            }
            self.reap_reconnection().await?;

            match self.tick(&cancel).await {
                Ok(()) => {
                    self.failures.store(0, Ordering::SeqCst);
                }
                Err(source) => {
                    let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                    if failures >= self.max_consecutive_failures {
                        error!(
                            service = %self.service_name,
                            failures,
                            error = %source,
                            "health_monitor_giving_up"
                        );
                        return Err(ConnectionError::HealthMonitor {
                            service: self.service_name.clone(),
                            failures,
                            source,
                        });
                    }
                    warn!(
                        service = %self.service_name,
                        failures,
                        error = %source,
                        "health_monitor_error"
                    );
                }
            }
        }

        info!(service = %self.service_name, "health_monitor_stopped");
        Ok(())
    }

    /// One pass of the state dispatch.
    ///
    /// # Errors
    /// The probe's own error when the health check cannot be performed.
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<(), LinkGuardError> {
        match self.state.state() {
            ConnectionState::Ready => {
                if self.probe.check_connection_health().await? {
                    debug!(service = %self.service_name, "health_check_passed");
                } else {
                    warn!(service = %self.service_name, "health_check_failed");
                    self.state.transition(
                        ConnectionState::Disconnected,
                        Some("health check failed".to_string()),
                    );
                    self.start_reconnection(cancel);
                }
            }
            ConnectionState::Disconnected => self.start_reconnection(cancel),
            _ => {}
        }
        Ok(())
    }

    fn start_reconnection(&self, cancel: &CancellationToken) {
        let mut slot = self.reconnection.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!(service = %self.service_name, "reconnection_already_running");
            return;
        }
        info!(service = %self.service_name, "reconnection_started");
        let coordinator = Arc::clone(&self.coordinator);
        let cancel = cancel.clone();
        *slot = Some(tokio::spawn(async move { coordinator.connect_with_retry(&cancel).await }));
    }

    /// Surfaces the result of a finished reconnection task.
    async fn reap_reconnection(&self) -> ConnectionResult<()> {
        let finished = {
            let mut slot = self.reconnection.lock();
            match slot.as_ref() {
                Some(task) if task.is_finished() => slot.take(),
                _ => None,
            }
        };
        let Some(task) = finished else {
            return Ok(());
        };
        match task.await {
            Ok(Ok(outcome)) => {
                debug!(service = %self.service_name, ?outcome, "reconnection_finished");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(ConnectionError::Join {
                service: self.service_name.clone(),
                task: "reconnection",
                message: e.to_string(),
            }),
        }
    }

    /// Returns `false` when cancelled before the interval elapsed.
    async fn sleep_interval(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.interval) => true,
        }
    }
}
