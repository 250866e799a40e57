//! Application context - dependency injection container
//!
//! Built once per process. Owns the shared tracker, the error classifier and
//! the alert suppression manager, and keeps every registered
//! [`ConnectionManager`] so shutdown can stop them together.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use linkguard_common::time::{Clock, SystemClock};
use linkguard_core::classifier::ServiceTypeMapping;
use linkguard_core::ports::{ConnectionProbe, ConnectionStateReader, NotificationSink};
use linkguard_core::{
    AlertSuppressionManager, ConnectOutcome, ConnectionManager, ConnectionStateTracker,
    ConnectionStatus, ConnectionStore, ReconnectionErrorClassifier,
};
use linkguard_domain::{LinkGuardError, MonitorConfig, Result};
use linkguard_infra::{open_store, ConfigLoader, LoggingNotificationSink};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

static GLOBAL_CONTEXT: OnceCell<Arc<AppContext>> = OnceCell::const_new();

/// Process-wide context, created from [`ConfigLoader::load`] on first use.
///
/// Concurrent first calls share one initialisation; a failed initialisation
/// is not cached and the next call retries.
///
/// # Errors
/// Configuration or store failures from [`AppContext::new`].
pub async fn global_context() -> Result<Arc<AppContext>> {
    GLOBAL_CONTEXT
        .get_or_try_init(|| async { AppContext::new().await.map(Arc::new) })
        .await
        .map(Arc::clone)
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: MonitorConfig,
    pub clock: Arc<dyn Clock>,
    pub tracker: Arc<ConnectionStateTracker>,
    pub classifier: Arc<ReconnectionErrorClassifier>,
    pub suppression: Arc<AlertSuppressionManager>,
    notifications: Arc<dyn NotificationSink>,
    managers: Mutex<BTreeMap<String, Arc<ConnectionManager>>>,
}

impl AppContext {
    /// Create a context from the configuration file found by the loader.
    ///
    /// # Errors
    /// Configuration load failures and store open failures.
    pub async fn new() -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::new_with_config(config).await
    }

    /// # Errors
    /// Store open failures.
    pub async fn new_with_config(config: MonitorConfig) -> Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock))
    }

    /// Create a context reading time from `clock`.
    ///
    /// Tests use this with a `MockClock` to control timestamps.
    ///
    /// # Errors
    /// Store open failures.
    pub fn new_with_clock(config: MonitorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = open_store(&config.store, clock)?;
        Ok(Self::new_with_store(config, store))
    }

    /// Create a context over an already-open store, using the store's clock.
    pub fn new_with_store(config: MonitorConfig, store: ConnectionStore) -> Self {
        let clock = Arc::clone(store.clock());
        let tracker = Arc::new(ConnectionStateTracker::new(store));

        let mut mapping = ServiceTypeMapping::with_defaults();
        for (service, service_type) in &config.suppression.service_type_mapping {
            mapping.add_mapping(service.clone(), *service_type);
        }
        let classifier = Arc::new(ReconnectionErrorClassifier::with_mapping(mapping));

        let suppression = Arc::new(AlertSuppressionManager::new(
            config.suppression.clone(),
            Arc::clone(&tracker) as Arc<dyn ConnectionStateReader>,
            Arc::clone(&classifier),
        ));

        info!(
            sqlite = config.store.sqlite_path.is_some(),
            mapped_services = config.suppression.service_type_mapping.len(),
            suppression_enabled = config.suppression.rule.enabled,
            "app_context_initialized"
        );

        Self {
            config,
            clock,
            tracker,
            classifier,
            suppression,
            notifications: Arc::new(LoggingNotificationSink::new()),
            managers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replace the sink used by connection managers registered afterwards.
    #[must_use]
    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }

    /// Create and keep a manager for `service_name` using its configured
    /// retry and health-check settings.
    ///
    /// # Errors
    /// - `InvalidInput` if the service is already registered
    /// - `Connection` if its backoff settings are inconsistent
    pub fn register_connection(
        &self,
        service_name: &str,
        probe: Arc<dyn ConnectionProbe>,
    ) -> Result<Arc<ConnectionManager>> {
        let mut managers = self.managers.lock();
        if managers.contains_key(service_name) {
            return Err(LinkGuardError::InvalidInput(format!(
                "connection '{service_name}' is already registered"
            )));
        }

        let manager = ConnectionManager::builder(self.config.connection(service_name), probe)
            .clock(Arc::clone(&self.clock))
            .tracker(Arc::clone(&self.tracker))
            .notification_sink(Arc::clone(&self.notifications))
            .build()?;
        let manager = Arc::new(manager);
        managers.insert(service_name.to_string(), Arc::clone(&manager));

        info!(service = service_name, "connection_registered");
        Ok(manager)
    }

    pub fn connection_manager(&self, service_name: &str) -> Option<Arc<ConnectionManager>> {
        self.managers.lock().get(service_name).cloned()
    }

    /// Connect a registered service and start its health monitor.
    ///
    /// # Errors
    /// `NotFound` for unregistered services, otherwise the manager's error.
    pub async fn start_connection(&self, service_name: &str) -> Result<ConnectOutcome> {
        let manager = self
            .connection_manager(service_name)
            .ok_or_else(|| LinkGuardError::NotFound(format!("connection '{service_name}'")))?;
        Ok(manager.start().await?)
    }

    /// Status of every registered connection, by service name.
    pub fn connection_statuses(&self) -> Vec<ConnectionStatus> {
        let managers: Vec<Arc<ConnectionManager>> = self.managers.lock().values().cloned().collect();
        managers.iter().map(|m| m.status()).collect()
    }

    /// Health summary built from the shared store.
    ///
    /// Every service with a persisted record is a component, including ones
    /// owned by other processes.
    pub async fn health_check(&self) -> HealthStatus {
        let checked_at = DateTime::<Utc>::from(self.clock.system_time());
        let mut status = HealthStatus::new(checked_at);

        match self.tracker.get_all_connection_states().await {
            Ok(states) => {
                status = status.add_component(ComponentHealth::healthy("store"));
                let mut services: Vec<_> = states.values().collect();
                services.sort_by(|a, b| a.service_name.cmp(&b.service_name));
                for info in services {
                    status = status.add_component(ComponentHealth::from_state(info));
                }
            }
            Err(e) => {
                warn!(error = %e, "store health check failed");
                status = status.add_component(ComponentHealth::unhealthy("store", e.to_string()));
            }
        }

        status.calculate_score();
        status
    }

    /// Stop every registered connection manager concurrently.
    ///
    /// Managers are removed from the context whether or not they stop
    /// cleanly.
    ///
    /// # Errors
    /// The first stop failure, after all managers have been stopped. A fatal
    /// error that ended a connection's monitoring counts as a failure.
    pub async fn shutdown(&self) -> Result<()> {
        let managers: Vec<Arc<ConnectionManager>> =
            std::mem::take(&mut *self.managers.lock()).into_values().collect();
        info!(connections = managers.len(), "app_context_shutdown");

        let results = join_all(managers.iter().map(|m| m.stop())).await;

        let mut first_error = None;
        for (manager, result) in managers.iter().zip(results) {
            if let Err(e) = result {
                error!(service = manager.service_name(), error = %e, "connection_stop_failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}
