//! Connect-with-retry loop.

use std::sync::Arc;
use std::time::Duration;

use linkguard_domain::ConnectionState;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::{ConnectionError, ConnectionResult};
use super::metrics::MetricsTracker;
use super::notifier::ConnectionNotifier;
use super::reconnection::{BackoffOutcome, ReconnectionHandler};
use super::state::LocalConnectionState;
use crate::ports::ConnectionProbe;

/// How a connect loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// Shutdown was requested before a connection was made.
    Shutdown,
}

/// Drives `establish_connection` until it succeeds, the retry budget runs
/// out, or shutdown is requested.
pub struct RetryCoordinator {
    service_name: String,
    state: Arc<LocalConnectionState>,
    metrics: Arc<MetricsTracker>,
    handler: ReconnectionHandler,
    notifier: Arc<ConnectionNotifier>,
    probe: Arc<dyn ConnectionProbe>,
    attempt_timeout: Duration,
}

impl RetryCoordinator {
    pub fn new(
        state: Arc<LocalConnectionState>,
        metrics: Arc<MetricsTracker>,
        handler: ReconnectionHandler,
        notifier: Arc<ConnectionNotifier>,
        probe: Arc<dyn ConnectionProbe>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            service_name: state.service_name().to_string(),
            state,
            metrics,
            handler,
            notifier,
            probe,
            attempt_timeout,
        }
    }

    /// # Errors
    /// [`ConnectionError::RetriesExhausted`] once the failure streak reaches
    /// the configured maximum.
    pub async fn connect_with_retry(
        &self,
        cancel: &CancellationToken,
    ) -> ConnectionResult<ConnectOutcome> {
        loop {
            if cancel.is_cancelled() {
                info!(service = %self.service_name, "connect_aborted_for_shutdown");
                return Ok(ConnectOutcome::Shutdown);
            }

            if !self.handler.should_retry() {
                let failures = self.metrics.consecutive_failures();
                error!(
                    service = %self.service_name,
                    failures,
                    max_failures = self.handler.max_failures(),
                    "connection_retries_exhausted"
                );
                return Err(ConnectionError::RetriesExhausted {
                    service: self.service_name.clone(),
                    failures,
                });
            }

            if self.handler.apply_backoff(cancel).await == BackoffOutcome::Cancelled {
                info!(service = %self.service_name, "connect_aborted_for_shutdown");
                return Ok(ConnectOutcome::Shutdown);
            }

            if self.attempt().await {
                return Ok(ConnectOutcome::Connected);
            }
        }
    }

    async fn attempt(&self) -> bool {
        let prior_failures = self.metrics.consecutive_failures();
        let reconnecting = prior_failures > 0 || self.metrics.successful_connections() > 0;
        if reconnecting {
            self.metrics.record_reconnection_attempt();
        }

        self.state.transition(ConnectionState::Connecting, None);
        let result =
            tokio::time::timeout(self.attempt_timeout, self.probe.establish_connection()).await;

        let failure = match result {
            Ok(Ok(true)) => None,
            Ok(Ok(false)) => Some("connection attempt failed".to_string()),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "connection attempt timed out after {}s",
                self.attempt_timeout.as_secs_f64()
            )),
        };

        match failure {
            None => {
                self.metrics.increment_total_connections();
                self.metrics.record_success();
                self.state.transition(ConnectionState::Ready, None);
                let details = if reconnecting {
                    format!("Connection restored after {} attempts", prior_failures + 1)
                } else {
                    "Connection established".to_string()
                };
                info!(service = %self.service_name, attempts = prior_failures + 1, "connection_ready");
                self.notifier.notify(true, &details).await;
                true
            }
            Some(reason) => {
                let failures = self.metrics.record_failure();
                warn!(
                    service = %self.service_name,
                    consecutive_failures = failures,
                    error = %reason,
                    "connection_attempt_failed"
                );
                self.state.transition(ConnectionState::Failed, Some(reason.clone()));
                if failures == 1 {
                    self.notifier.notify(false, &format!("Connection lost: {reason}")).await;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use linkguard_common::resilience::{BackoffPolicy, FixedJitter};
    use linkguard_common::time::Clock;
    use linkguard_common::MockClock;

    use super::*;
    use crate::testing::{ProbeStep, RecordingSink, ScriptedProbe};

    struct Fixture {
        coordinator: RetryCoordinator,
        state: Arc<LocalConnectionState>,
        metrics: Arc<MetricsTracker>,
        sink: Arc<RecordingSink>,
        probe: Arc<ScriptedProbe>,
    }

    fn fixture(connect: Vec<ProbeStep>, max_failures: u32) -> Fixture {
        fixture_with(ScriptedProbe::new(connect, Vec::new()), max_failures)
    }

    fn fixture_with(probe: ScriptedProbe, max_failures: u32) -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(MockClock::new());
        let metrics = Arc::new(MetricsTracker::new(Arc::clone(&clock)));
        let state = Arc::new(LocalConnectionState::new("svc", clock, Arc::clone(&metrics)));
        let sink = Arc::new(RecordingSink::new());
        let probe = Arc::new(probe);
        let handler = ReconnectionHandler::new(
            "svc",
            BackoffPolicy::new(1.0, 8.0, 2.0).unwrap(),
            max_failures,
            Arc::clone(&metrics),
        )
        .with_jitter(Arc::new(FixedJitter(0.0)));
        let notifier = Arc::new(
            ConnectionNotifier::new("svc", Arc::clone(&metrics))
                .with_sink(Arc::clone(&sink) as Arc<dyn crate::ports::NotificationSink>),
        );
        let coordinator = RetryCoordinator::new(
            Arc::clone(&state),
            Arc::clone(&metrics),
            handler,
            notifier,
            Arc::clone(&probe) as Arc<dyn ConnectionProbe>,
            Duration::from_secs(30),
        );
        Fixture { coordinator, state, metrics, sink, probe }
    }

    #[tokio::test(start_paused = true)]
    async fn first_connect_is_established() {
        let f = fixture(vec![ProbeStep::Succeed], 5);
        let outcome = f.coordinator.connect_with_retry(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(f.state.state(), ConnectionState::Ready);
        assert_eq!(f.metrics.snapshot().total_connections, 1);
        assert_eq!(f.sink.sent(), vec![("svc".to_string(), true, "Connection established".to_string())]);
    }

    /// Validates that only the first failure of a streak notifies and the
    /// recovery message counts every attempt.
    #[tokio::test(start_paused = true)]
    async fn recovers_after_failures() {
        let f = fixture(
            vec![ProbeStep::Refuse, ProbeStep::Error("connection reset".into()), ProbeStep::Succeed],
            5,
        );
        let outcome = f.coordinator.connect_with_retry(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(f.probe.connect_calls(), 3);
        let sent = f.sink.sent();
        assert_eq!(sent.len(), 2);
        assert!(!sent[0].1);
        assert!(sent[0].2.starts_with("Connection lost"));
        assert_eq!(sent[1].2, "Connection restored after 3 attempts");

        let metrics = f.metrics.snapshot();
        assert_eq!(metrics.failed_connections, 2);
        assert_eq!(metrics.consecutive_failures, 0);
        assert_eq!(metrics.total_reconnection_attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_max_failures() {
        let probe = ScriptedProbe::new(Vec::new(), Vec::new()).with_connect_fallback(ProbeStep::Refuse);
        let f = fixture_with(probe, 3);

        let err = f.coordinator.connect_with_retry(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ConnectionError::RetriesExhausted { failures: 3, .. }));
        assert_eq!(f.probe.connect_calls(), 3);
        assert_eq!(f.state.state(), ConnectionState::Failed);
        assert_eq!(f.sink.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_without_error() {
        let f = fixture(vec![ProbeStep::Refuse], 5);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = f.coordinator.connect_with_retry(&cancel).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Shutdown);
        assert_eq!(f.probe.connect_calls(), 0);
    }
}
