//! Connection lifecycle
//!
//! State machine, retry with backoff, health monitoring and state
//! broadcasting for a single service connection. The retry and health loops
//! are the only writers of a service's state.

mod broadcaster;
mod error;
mod health;
mod manager;
mod metrics;
mod notifier;
mod reconnection;
mod retry;
mod state;

pub use broadcaster::spawn_state_broadcaster;
pub use error::{ConnectionError, ConnectionResult};
pub use health::HealthMonitor;
pub use manager::{ConnectionManager, ConnectionManagerBuilder, ConnectionStatus};
pub use metrics::MetricsTracker;
pub use notifier::ConnectionNotifier;
pub use reconnection::{BackoffOutcome, ReconnectionHandler};
pub use retry::{ConnectOutcome, RetryCoordinator};
pub use state::{transition_channel, LocalConnectionState, StateTransition};
