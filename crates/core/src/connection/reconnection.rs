//! Retry budget and backoff sleeps.

use std::sync::Arc;
use std::time::Duration;

use linkguard_common::resilience::{BackoffPolicy, JitterSource, RandomJitter};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::metrics::MetricsTracker;

/// What [`ReconnectionHandler::apply_backoff`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffOutcome {
    /// No failures yet, so no wait.
    Skipped,
    Waited,
    /// Shutdown was requested mid-wait.
    Cancelled,
}

/// Decides whether to keep retrying and how long to wait in between.
///
/// Failure counts are read from the shared [`MetricsTracker`].
pub struct ReconnectionHandler {
    service_name: String,
    policy: BackoffPolicy,
    max_failures: u32,
    metrics: Arc<MetricsTracker>,
    jitter: Arc<dyn JitterSource>,
}

impl ReconnectionHandler {
    pub fn new(
        service_name: impl Into<String>,
        policy: BackoffPolicy,
        max_failures: u32,
        metrics: Arc<MetricsTracker>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            policy,
            max_failures,
            metrics,
            jitter: Arc::new(RandomJitter),
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.metrics.consecutive_failures() < self.max_failures
    }

    /// Delay for the current failure streak; `0.0` with no failures.
    #[must_use]
    pub fn calculate_backoff_delay(&self) -> f64 {
        self.policy.delay_seconds(self.metrics.consecutive_failures(), self.jitter.as_ref())
    }

    /// Sleeps for the backoff delay unless there are no failures yet.
    ///
    /// The delay is published on the metrics before sleeping.
    pub async fn apply_backoff(&self, cancel: &CancellationToken) -> BackoffOutcome {
        let failures = self.metrics.consecutive_failures();
        if failures == 0 {
            return BackoffOutcome::Skipped;
        }

        let delay = self.calculate_backoff_delay();
        self.metrics.set_backoff_delay(delay);
        info!(
            service = %self.service_name,
            consecutive_failures = failures,
            delay_seconds = delay,
            "reconnect_backoff"
        );

        let sleep = Duration::try_from_secs_f64(delay).unwrap_or(Duration::ZERO);
        tokio::select! {
            () = cancel.cancelled() => BackoffOutcome::Cancelled,
            () = tokio::time::sleep(sleep) => BackoffOutcome::Waited,
        }
    }
}
