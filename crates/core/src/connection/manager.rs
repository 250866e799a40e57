//! Per-service connection manager
//!
//! Owns the lifecycle pieces for one service and their background tasks:
//! - [`RetryCoordinator`] for the initial connect and every reconnect
//! - [`HealthMonitor`] spawned once connected
//! - the state broadcaster, when a tracker is attached
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use linkguard_core::connection::ConnectionManager;
//! use linkguard_core::ports::ConnectionProbe;
//! use linkguard_domain::ConnectionConfig;
//!
//! # async fn example(probe: Arc<dyn ConnectionProbe>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConnectionManager::builder(ConnectionConfig::new("kalshi"), probe).build()?;
//! manager.start().await?;
//!
//! // Resolves when health monitoring ends; a fatal error is returned here.
//! manager.wait().await?;
//!
//! manager.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use linkguard_common::resilience::{BackoffPolicy, JitterSource, RandomJitter};
use linkguard_common::time::{Clock, SystemClock};
use linkguard_domain::{ConnectionConfig, ConnectionMetrics, ConnectionState};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::broadcaster::spawn_state_broadcaster;
use super::error::{ConnectionError, ConnectionResult};
use super::health::HealthMonitor;
use super::metrics::MetricsTracker;
use super::notifier::ConnectionNotifier;
use super::reconnection::ReconnectionHandler;
use super::retry::{ConnectOutcome, RetryCoordinator};
use super::state::{transition_channel, LocalConnectionState, StateTransition};
use crate::ports::{ConnectionProbe, NotificationSink};
use crate::tracker::ConnectionStateTracker;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Point-in-time view of a managed connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub service_name: String,
    pub state: ConnectionState,
    pub seconds_in_state: f64,
    pub metrics: ConnectionMetrics,
    pub health_monitor_failures: u32,
    pub health_check_running: bool,
    pub reconnection_running: bool,
    pub shutdown_requested: bool,
}

/// Builder for [`ConnectionManager`].
pub struct ConnectionManagerBuilder {
    config: ConnectionConfig,
    probe: Arc<dyn ConnectionProbe>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
    sink: Option<Arc<dyn NotificationSink>>,
    tracker: Option<Arc<ConnectionStateTracker>>,
}

impl ConnectionManagerBuilder {
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Publishes state transitions and metrics through `tracker`.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<ConnectionStateTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// # Errors
    /// [`ConnectionError::InvalidBackoff`] when the configured delays are
    /// inconsistent.
    pub fn build(self) -> ConnectionResult<ConnectionManager> {
        let Self { config, probe, clock, jitter, sink, tracker } = self;
        let service = config.service_name.clone();

        let policy = BackoffPolicy::new(
            config.initial_reconnect_delay_seconds,
            config.max_reconnect_delay_seconds,
            config.backoff_multiplier,
        )
        .map_err(|source| ConnectionError::InvalidBackoff { service: service.clone(), source })?;

        let metrics = Arc::new(MetricsTracker::new(Arc::clone(&clock)));

        let mut state = LocalConnectionState::new(service.clone(), clock, Arc::clone(&metrics));
        let mut broadcast = None;
        if let Some(tracker) = &tracker {
            let (publisher, receiver) = transition_channel();
            state = state.with_publisher(publisher);
            broadcast = Some((Arc::clone(tracker), receiver));
        }
        let state = Arc::new(state);

        let mut notifier = ConnectionNotifier::new(service.clone(), Arc::clone(&metrics));
        if let Some(sink) = sink {
            notifier = notifier.with_sink(sink);
        }
        if let Some(tracker) = tracker {
            notifier = notifier.with_tracker(tracker);
        }

        let handler = ReconnectionHandler::new(
            service.clone(),
            policy,
            config.max_consecutive_failures,
            Arc::clone(&metrics),
        )
        .with_jitter(jitter);

        let coordinator = Arc::new(RetryCoordinator::new(
            Arc::clone(&state),
            Arc::clone(&metrics),
            handler,
            Arc::new(notifier),
            Arc::clone(&probe),
            Duration::from_secs(config.connection_timeout_seconds),
        ));

        let health = Arc::new(HealthMonitor::new(
            Arc::clone(&state),
            Arc::clone(&probe),
            Arc::clone(&coordinator),
            Duration::from_secs(config.health_check_interval_seconds),
            config.max_consecutive_failures,
        ));

        info!(service = %service, "connection_manager_initialized");
        Ok(ConnectionManager {
            config,
            probe,
            state,
            metrics,
            coordinator,
            health,
            shutdown: CancellationToken::new(),
            broadcast_shutdown: CancellationToken::new(),
            monitor_done: CancellationToken::new(),
            fatal: Arc::new(Mutex::new(None)),
            pending_broadcast: Mutex::new(broadcast),
            tasks: Mutex::new(Tasks::default()),
        })
    }
}

#[derive(Default)]
struct Tasks {
    health: Option<JoinHandle<()>>,
    broadcaster: Option<JoinHandle<()>>,
}

type PendingBroadcast = (Arc<ConnectionStateTracker>, UnboundedReceiver<StateTransition>);

/// Connection lifecycle for one service.
pub struct ConnectionManager {
    config: ConnectionConfig,
    probe: Arc<dyn ConnectionProbe>,
    state: Arc<LocalConnectionState>,
    metrics: Arc<MetricsTracker>,
    coordinator: Arc<RetryCoordinator>,
    health: Arc<HealthMonitor>,
    shutdown: CancellationToken,
    broadcast_shutdown: CancellationToken,
    /// Fires once the health monitor task has exited.
    monitor_done: CancellationToken,
    /// Error that ended monitoring, held until `wait` or `stop` reports it.
    fatal: Arc<Mutex<Option<ConnectionError>>>,
    pending_broadcast: Mutex<Option<PendingBroadcast>>,
    tasks: Mutex<Tasks>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("service_name", &self.config.service_name)
            .field("state", &self.state.state())
            .field("shutdown_requested", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn builder(
        config: ConnectionConfig,
        probe: Arc<dyn ConnectionProbe>,
    ) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder {
            config,
            probe,
            clock: Arc::new(SystemClock),
            jitter: Arc::new(RandomJitter),
            sink: None,
            tracker: None,
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.state()
    }

    /// Connects (with retry) and then starts health monitoring.
    ///
    /// Returns [`ConnectOutcome::Shutdown`] when `stop` won the race; no
    /// monitor is started then.
    ///
    /// # Errors
    /// - [`ConnectionError::AlreadyRunning`] on a second call
    /// - [`ConnectionError::RetriesExhausted`] when the first connect never
    ///   succeeds
    pub async fn start(&self) -> ConnectionResult<ConnectOutcome> {
        if self.tasks.lock().health.is_some() {
            return Err(ConnectionError::AlreadyRunning(self.config.service_name.clone()));
        }

        if let Some((tracker, receiver)) = self.pending_broadcast.lock().take() {
            let handle =
                spawn_state_broadcaster(tracker, receiver, self.broadcast_shutdown.clone());
            self.tasks.lock().broadcaster = Some(handle);
        }

        info!(service = %self.config.service_name, "connection_manager_starting");
        let outcome = self.coordinator.connect_with_retry(&self.shutdown).await?;
        if outcome == ConnectOutcome::Connected {
            let handle = self.spawn_health_monitor();
            self.tasks.lock().health = Some(handle);
        }
        Ok(outcome)
    }

    fn spawn_health_monitor(&self) -> JoinHandle<()> {
        let monitor = Arc::clone(&self.health);
        let cancel = self.shutdown.clone();
        let done = self.monitor_done.clone();
        let fatal = Arc::clone(&self.fatal);
        let service = self.config.service_name.clone();
        tokio::spawn(async move {
            if let Err(e) = monitor.run(cancel).await {
                error!(service = %service, error = %e, "connection_manager_fatal");
                *fatal.lock() = Some(e);
            }
            done.cancel();
        })
    }

    /// Resolves once health monitoring has ended.
    ///
    /// Returns immediately when no monitor was started.
    ///
    /// # Errors
    /// The fatal error that ended monitoring:
    /// - [`ConnectionError::RetriesExhausted`] from a reconnection
    /// - [`ConnectionError::HealthMonitor`] after repeated probe errors
    pub async fn wait(&self) -> ConnectionResult<()> {
        let started = self.tasks.lock().health.is_some();
        if !started && !self.monitor_done.is_cancelled() {
            return Ok(());
        }
        self.monitor_done.cancelled().await;
        self.take_fatal()
    }

    fn take_fatal(&self) -> ConnectionResult<()> {
        self.fatal.lock().take().map_or(Ok(()), Err)
    }

    /// Cancels and awaits the background tasks, then releases the
    /// connection.
    ///
    /// Cleanup always runs to completion before an error is returned.
    ///
    /// # Errors
    /// - The fatal error that ended monitoring, unless [`Self::wait`]
    ///   already returned it
    /// - [`ConnectionError::ShutdownTimeout`] if a task ignores cancellation
    pub async fn stop(&self) -> ConnectionResult<()> {
        let service = self.config.service_name.clone();
        info!(service = %service, "connection_manager_stopping");
        self.shutdown.cancel();

        let health = self.tasks.lock().health.take();
        if let Some(handle) = health {
            self.await_task("health_monitor", handle).await?;
        }
        if let Some(handle) = self.health.take_reconnection_task() {
            if let Err(e) = self.await_task("reconnection", handle).await? {
                warn!(service = %service, error = %e, "reconnection_ended_with_error");
                self.fatal.lock().get_or_insert(e);
            }
        }

        if let Err(e) = self.probe.cleanup_connection().await {
            warn!(service = %service, error = %e, "connection_cleanup_failed");
        }
        self.state.transition(ConnectionState::Disconnected, Some("shutdown".to_string()));

        self.broadcast_shutdown.cancel();
        let broadcaster = self.tasks.lock().broadcaster.take();
        if let Some(handle) = broadcaster {
            self.await_task("state_broadcaster", handle).await?;
        }

        info!(service = %service, "connection_manager_stopped");
        self.take_fatal()
    }

    async fn await_task<T>(
        &self,
        task: &'static str,
        handle: JoinHandle<T>,
    ) -> ConnectionResult<T> {
        let service = self.config.service_name.clone();
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ConnectionError::Join { service, task, message: e.to_string() }),
            Err(_) => Err(ConnectionError::ShutdownTimeout {
                service,
                task,
                timeout: SHUTDOWN_TIMEOUT,
            }),
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        let health_check_running =
            self.tasks.lock().health.as_ref().is_some_and(|task| !task.is_finished());
        ConnectionStatus {
            service_name: self.config.service_name.clone(),
            state: self.state.state(),
            seconds_in_state: self.state.duration_in_state().as_secs_f64(),
            metrics: self.metrics.snapshot(),
            health_monitor_failures: self.health.failure_count(),
            health_check_running,
            reconnection_running: self.health.reconnection_running(),
            shutdown_requested: self.shutdown.is_cancelled(),
        }
    }
}
