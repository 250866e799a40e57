//! Authoritative in-process connection state for one service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use linkguard_common::time::Clock;
use linkguard_domain::ConnectionState;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use super::metrics::MetricsTracker;

/// A state change, as published to the broadcaster.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub service_name: String,
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub error_context: Option<String>,
    pub consecutive_failures: u32,
}

/// Channel carrying [`StateTransition`]s to the broadcaster.
#[must_use]
pub fn transition_channel() -> (UnboundedSender<StateTransition>, UnboundedReceiver<StateTransition>) {
    mpsc::unbounded_channel()
}

struct Current {
    state: ConnectionState,
    changed_at: Instant,
}

/// Current state plus the time it was entered.
///
/// Transitions are published fire-and-forget: a closed channel is logged and
/// never blocks or fails the transition itself.
pub struct LocalConnectionState {
    service_name: String,
    current: Mutex<Current>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsTracker>,
    publisher: Option<UnboundedSender<StateTransition>>,
}

impl LocalConnectionState {
    /// Starts in `disconnected`.
    pub fn new(
        service_name: impl Into<String>,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsTracker>,
    ) -> Self {
        let changed_at = clock.now();
        Self {
            service_name: service_name.into(),
            current: Mutex::new(Current { state: ConnectionState::Disconnected, changed_at }),
            clock,
            metrics,
            publisher: None,
        }
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: UnboundedSender<StateTransition>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.current.lock().state
    }

    #[must_use]
    pub fn duration_in_state(&self) -> Duration {
        let changed_at = self.current.lock().changed_at;
        self.clock.now().saturating_duration_since(changed_at)
    }

    /// Moves to `new_state`. Returns `false` (and does nothing) when already
    /// there.
    pub fn transition(&self, new_state: ConnectionState, error_context: Option<String>) -> bool {
        let from = {
            let mut current = self.current.lock();
            if current.state == new_state {
                return false;
            }
            let from = current.state;
            current.state = new_state;
            current.changed_at = self.clock.now();
            from
        };

        match &error_context {
            Some(context) => info!(
                service = %self.service_name,
                from = %from,
                to = %new_state,
                error_context = %context,
                "connection_state_transition"
            ),
            None => info!(
                service = %self.service_name,
                from = %from,
                to = %new_state,
                "connection_state_transition"
            ),
        }

        if let Some(publisher) = &self.publisher {
            let transition = StateTransition {
                service_name: self.service_name.clone(),
                from,
                to: new_state,
                error_context,
                consecutive_failures: self.metrics.consecutive_failures(),
            };
            if publisher.send(transition).is_err() {
                warn!(service = %self.service_name, to = %new_state, "state_broadcast_channel_closed");
            }
        }
        true
    }
}
