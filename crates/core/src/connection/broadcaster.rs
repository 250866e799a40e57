//! Forwards local state transitions into the shared tracker.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::StateTransition;
use crate::tracker::ConnectionStateTracker;

/// Spawns the broadcaster task.
///
/// Runs until the channel closes or `shutdown` fires; on shutdown, anything
/// already queued is still delivered.
pub fn spawn_state_broadcaster(
    tracker: Arc<ConnectionStateTracker>,
    mut transitions: UnboundedReceiver<StateTransition>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                next = transitions.recv() => match next {
                    Some(transition) => publish(&tracker, transition).await,
                    None => break,
                },
                () = shutdown.cancelled() => {
                    while let Ok(transition) = transitions.try_recv() {
                        publish(&tracker, transition).await;
                    }
                    break;
                }
            }
        }
        debug!("state_broadcaster_stopped");
    })
}

async fn publish(tracker: &ConnectionStateTracker, transition: StateTransition) {
    let StateTransition { service_name, to, error_context, consecutive_failures, .. } = transition;
    match tracker
        .update_connection_state(&service_name, to, error_context, consecutive_failures)
        .await
    {
        Ok(true) => debug!(service = %service_name, state = %to, "state_broadcast"),
        Ok(false) => warn!(service = %service_name, state = %to, "state_broadcast_not_persisted"),
        Err(e) => warn!(service = %service_name, state = %to, error = %e, "state_broadcast_failed"),
    }
}
