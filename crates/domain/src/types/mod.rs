//! Domain types and models

pub mod alerting;
pub mod connection;

pub use alerting::{
    AlertType, DecisionTally, ServiceType, SuppressionContext, SuppressionDecision,
    SuppressionReport, SuppressionRule, SuppressionStatistics,
};
pub use connection::{ConnectionMetrics, ConnectionState, ConnectionStateInfo, ReconnectionEvent};
