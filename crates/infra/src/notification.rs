//! Notification delivery through the structured log.

use async_trait::async_trait;
use linkguard_core::ports::NotificationSink;
use linkguard_domain::Result;
use tracing::{info, warn};

/// Writes connection notifications as `connection_notification` log events.
///
/// Restorations log at `info`, losses at `warn`, so an alert pipeline that
/// tails the log can route them without parsing `details`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSink;

impl LoggingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn send_connection_notification(
        &self,
        service_name: &str,
        is_connected: bool,
        details: &str,
    ) -> Result<()> {
        if is_connected {
            info!(service = %service_name, is_connected, details, "connection_notification");
        } else {
            warn!(service = %service_name, is_connected, details, "connection_notification");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivery_never_fails() {
        let sink = LoggingNotificationSink::new();
        sink.send_connection_notification("kalshi", false, "Connection lost: reset").await.unwrap();
        sink.send_connection_notification("kalshi", true, "Connection established").await.unwrap();
    }
}
