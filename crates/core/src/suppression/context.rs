//! Gathers connection facts for one suppression decision.

use linkguard_domain::{ServiceType, SuppressionContext, SuppressionRule};

use crate::classifier::ReconnectionErrorClassifier;
use crate::ports::ConnectionStateReader;
use crate::tracker::TrackerResult;

/// Builds a [`SuppressionContext`] from the state reader and classifier.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    grace_period_seconds: u64,
    require_reconnection_error_pattern: bool,
}

impl ContextBuilder {
    #[must_use]
    pub fn new(rule: &SuppressionRule) -> Self {
        Self {
            grace_period_seconds: rule.grace_period_seconds,
            require_reconnection_error_pattern: rule.require_reconnection_error_pattern,
        }
    }

    /// # Errors
    /// Propagates tracker failures; no decision is made on partial facts.
    pub async fn build(
        &self,
        reader: &dyn ConnectionStateReader,
        classifier: &ReconnectionErrorClassifier,
        service_name: &str,
        service_type: ServiceType,
        error_message: Option<&str>,
    ) -> TrackerResult<SuppressionContext> {
        let is_in_reconnection = reader.is_service_in_reconnection(service_name).await?;
        let is_in_grace_period =
            reader.is_service_in_grace_period(service_name, self.grace_period_seconds).await?;
        let reconnection_duration = reader.get_reconnection_duration(service_name).await?;

        let grace_period_remaining_seconds = if is_in_grace_period {
            self.grace_remaining(reader, service_name).await?
        } else {
            None
        };

        let is_reconnection_error = match error_message {
            Some(message) if !message.is_empty() => {
                !self.require_reconnection_error_pattern
                    || classifier.is_reconnection_error_for_type(service_type, message)
            }
            _ => false,
        };

        Ok(SuppressionContext {
            service_type,
            is_in_reconnection,
            is_in_grace_period,
            reconnection_duration,
            grace_period_remaining_seconds,
            is_reconnection_error,
        })
    }

    async fn grace_remaining(
        &self,
        reader: &dyn ConnectionStateReader,
        service_name: &str,
    ) -> TrackerResult<Option<f64>> {
        let last_success = reader
            .get_connection_state(service_name)
            .await?
            .and_then(|info| info.last_successful_connection);
        #[allow(clippy::cast_precision_loss)]
        let grace = self.grace_period_seconds as f64;
        Ok(last_success.map(|at| (grace - (reader.now() - at)).max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkguard_common::MockClock;
    use linkguard_domain::ConnectionState;

    use super::*;
    use crate::store::ConnectionStore;
    use crate::testing::memory_backend;
    use crate::tracker::ConnectionStateTracker;

    const T0: f64 = 1_700_000_000.0;

    fn tracker(clock: &MockClock) -> ConnectionStateTracker {
        let (_, backend) = memory_backend();
        ConnectionStateTracker::new(ConnectionStore::new(backend, Arc::new(clock.clone())))
    }

    #[tokio::test]
    async fn reconnecting_service_with_pattern_error() {
        let clock = MockClock::at_unix(T0);
        let tracker = tracker(&clock);
        tracker.update_connection_state("kalshi", ConnectionState::Ready, None, 0).await.unwrap();
        clock.advance_secs(1000.0);
        tracker
            .update_connection_state("kalshi", ConnectionState::Reconnecting, None, 1)
            .await
            .unwrap();
        clock.advance_secs(45.0);

        let builder = ContextBuilder::new(&SuppressionRule::default());
        let classifier = ReconnectionErrorClassifier::new();
        let ctx = builder
            .build(&tracker, &classifier, "kalshi", ServiceType::Websocket, Some("connection lost"))
            .await
            .unwrap();

        assert!(ctx.is_in_reconnection);
        assert!(ctx.is_in_grace_period);
        assert_eq!(ctx.reconnection_duration, Some(45.0));
        // Last success was 1045s ago, so the grace window has run out.
        assert_eq!(ctx.grace_period_remaining_seconds, Some(0.0));
        assert!(ctx.is_reconnection_error);
    }

    #[tokio::test]
    async fn grace_remaining_counts_down_after_recovery() {
        let clock = MockClock::at_unix(T0);
        let tracker = tracker(&clock);
        tracker.update_connection_state("deribit", ConnectionState::Failed, None, 1).await.unwrap();
        clock.advance_secs(20.0);
        tracker.update_connection_state("deribit", ConnectionState::Ready, None, 0).await.unwrap();
        clock.advance_secs(150.0);

        let builder = ContextBuilder::new(&SuppressionRule::default());
        let classifier = ReconnectionErrorClassifier::new();
        let ctx = builder
            .build(&tracker, &classifier, "deribit", ServiceType::Websocket, None)
            .await
            .unwrap();

        assert!(!ctx.is_in_reconnection);
        assert!(ctx.is_in_grace_period);
        assert_eq!(ctx.reconnection_duration, None);
        assert_eq!(ctx.grace_period_remaining_seconds, Some(150.0));
        assert!(!ctx.is_reconnection_error);
    }

    /// Validates that without the pattern requirement any non-empty message
    /// counts, while an empty one never does.
    #[tokio::test]
    async fn pattern_requirement_can_be_relaxed() {
        let clock = MockClock::at_unix(T0);
        let tracker = tracker(&clock);
        let rule = SuppressionRule { require_reconnection_error_pattern: false, ..Default::default() };
        let builder = ContextBuilder::new(&rule);
        let classifier = ReconnectionErrorClassifier::new();

        let ctx = builder
            .build(&tracker, &classifier, "svc", ServiceType::Unknown, Some("disk full"))
            .await
            .unwrap();
        assert!(ctx.is_reconnection_error);
        assert!(!ctx.is_in_grace_period);
        assert_eq!(ctx.grace_period_remaining_seconds, None);

        let empty = builder
            .build(&tracker, &classifier, "svc", ServiceType::Unknown, Some(""))
            .await
            .unwrap();
        assert!(!empty.is_reconnection_error);
    }
}
