//! # LinkGuard Core
//!
//! Reliability logic for market-data service connections - no storage or
//! transport code.
//!
//! This crate contains:
//! - Connection lifecycle: backoff, retry, health monitoring
//! - Shared connection-state store and tracker façade
//! - Reconnection error classification
//! - Alert suppression decisions and history
//!
//! ## Architecture Principles
//! - Depends only on `linkguard-common` and `linkguard-domain`
//! - Storage, probes and notification delivery sit behind [`ports`]
//! - Every clock read goes through an injected `Clock`

pub mod classifier;
pub mod connection;
pub mod store;
pub mod suppression;
pub mod tracker;

// Infrastructure ports
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use classifier::{classify_error_type, ErrorCategory, ReconnectionErrorClassifier};
pub use connection::{
    ConnectOutcome, ConnectionError, ConnectionManager, ConnectionManagerBuilder, ConnectionStatus,
    HealthMonitor, LocalConnectionState, ReconnectionHandler, RetryCoordinator,
};
pub use ports::{ConnectionProbe, ConnectionStateReader, NotificationSink, StateBackend};
pub use store::{ConnectionStore, StoreError, StoreResult};
pub use suppression::{AlertSuppressionManager, SuppressionEngine, SuppressionError};
pub use tracker::{ConnectionStateTracker, TrackerError, TrackerResult};
