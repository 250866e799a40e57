//! Connection notifications and metrics publishing.

use std::sync::Arc;

use tracing::{debug, warn};

use super::metrics::MetricsTracker;
use crate::ports::NotificationSink;
use crate::tracker::ConnectionStateTracker;

/// Sends connect/disconnect notices and mirrors metrics to the tracker.
///
/// Delivery failures are logged and dropped; they never interrupt the
/// retry loop.
pub struct ConnectionNotifier {
    service_name: String,
    metrics: Arc<MetricsTracker>,
    sink: Option<Arc<dyn NotificationSink>>,
    tracker: Option<Arc<ConnectionStateTracker>>,
}

impl ConnectionNotifier {
    pub fn new(service_name: impl Into<String>, metrics: Arc<MetricsTracker>) -> Self {
        Self { service_name: service_name.into(), metrics, sink: None, tracker: None }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<ConnectionStateTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub async fn notify(&self, is_connected: bool, details: &str) {
        if let Some(sink) = &self.sink {
            if let Err(e) =
                sink.send_connection_notification(&self.service_name, is_connected, details).await
            {
                warn!(
                    service = %self.service_name,
                    is_connected,
                    error = %e,
                    "connection_notification_failed"
                );
            }
        }
        self.publish_metrics().await;
    }

    async fn publish_metrics(&self) {
        let Some(tracker) = &self.tracker else {
            return;
        };
        let metrics = match serde_json::to_value(self.metrics.snapshot()) {
            Ok(value) => value,
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "metrics_encode_failed");
                return;
            }
        };
        match tracker.store_service_metrics(&self.service_name, &metrics).await {
            Ok(()) => debug!(service = %self.service_name, "service_metrics_published"),
            Err(e) => warn!(service = %self.service_name, error = %e, "service_metrics_publish_failed"),
        }
    }
}
