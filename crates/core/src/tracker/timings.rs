//! Timing bookkeeping for state transitions.
//!
//! Pure function of the previous record, the new state and the current time;
//! the tracker persists whatever this decides.

use linkguard_domain::constants::{EVENT_RECONNECTION_START, EVENT_RECONNECTION_SUCCESS};
use linkguard_domain::{ConnectionState, ConnectionStateInfo};

/// Event to append to the service's reconnection log.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub event_type: &'static str,
    pub details: String,
}

/// Timing fields for the new record plus the event the transition produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTimings {
    pub reconnection_start_time: Option<f64>,
    pub last_successful_connection: Option<f64>,
    pub event: Option<TransitionEvent>,
}

/// Computes timing fields for a transition into `new_state` at `now`.
///
/// - First record: reconnection states start the clock, `ready` stamps the
///   last success, and nothing is logged.
/// - Entering reconnection from outside it starts the clock and logs `start`.
/// - Landing on `ready` from reconnection clears the clock, stamps the last
///   success and logs `success`.
/// - Anything else carries both fields forward.
#[must_use]
pub fn compute_transition(
    existing: Option<&ConnectionStateInfo>,
    new_state: ConnectionState,
    now: f64,
) -> TransitionTimings {
    let entering_reconnection = new_state.is_reconnection();

    let Some(existing) = existing else {
        return TransitionTimings {
            reconnection_start_time: entering_reconnection.then_some(now),
            last_successful_connection: (new_state == ConnectionState::Ready).then_some(now),
            event: None,
        };
    };

    if entering_reconnection && !existing.in_reconnection {
        return TransitionTimings {
            reconnection_start_time: Some(now),
            last_successful_connection: existing.last_successful_connection,
            event: Some(TransitionEvent {
                event_type: EVENT_RECONNECTION_START,
                details: format!("Entering reconnection from {}", existing.state),
            }),
        };
    }

    if existing.in_reconnection && new_state == ConnectionState::Ready {
        let details = match existing.reconnection_start_time {
            Some(started) => format!("Reconnection successful after {:.1}s", now - started),
            None => "Reconnection successful".to_string(),
        };
        return TransitionTimings {
            reconnection_start_time: None,
            last_successful_connection: Some(now),
            event: Some(TransitionEvent { event_type: EVENT_RECONNECTION_SUCCESS, details }),
        };
    }

    TransitionTimings {
        reconnection_start_time: existing.reconnection_start_time,
        last_successful_connection: existing.last_successful_connection,
        event: None,
    }
}
