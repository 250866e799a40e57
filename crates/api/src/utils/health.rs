//! Monitor health summary
//!
//! One [`ComponentHealth`] per tracked service plus one for the shared store.
//! A service counts as healthy unless the store says it is reconnecting.

use chrono::{DateTime, Utc};
use linkguard_domain::{ConnectionState, ConnectionStateInfo};
use serde::{Deserialize, Serialize};

/// Share of healthy components at or above which the monitor is healthy.
pub const HEALTHY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// `healthy_components / total_components`, 1.0 when there are none.
    pub score: f64,

    pub message: Option<String>,

    pub components: Vec<ComponentHealth>,

    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new(checked_at: DateTime<Utc>) -> Self {
        Self { is_healthy: true, score: 1.0, message: None, components: Vec::new(), checked_at }
    }

    #[must_use]
    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Recomputes `score` and `is_healthy` from the components.
    ///
    /// A summary message lists the unhealthy component names.
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let unhealthy: Vec<&str> =
            self.components.iter().filter(|c| !c.is_healthy).map(|c| c.name.as_str()).collect();
        let healthy_count = self.components.len() - unhealthy.len();

        self.score = healthy_count as f64 / self.components.len() as f64;
        self.is_healthy = self.score >= HEALTHY_THRESHOLD;
        self.message =
            (!unhealthy.is_empty()).then(|| format!("unhealthy: {}", unhealthy.join(", ")));
    }
}

/// Health of one service or subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub is_healthy: bool,
    pub state: Option<ConnectionState>,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, state: None, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, state: None, message: Some(message.into()) }
    }

    /// Health of a service from its persisted record.
    pub fn from_state(info: &ConnectionStateInfo) -> Self {
        let message = if info.in_reconnection {
            Some(match &info.error_context {
                Some(context) => format!("reconnecting: {context}"),
                None => "reconnecting".to_string(),
            })
        } else {
            None
        };
        Self {
            name: info.service_name.clone(),
            is_healthy: !info.in_reconnection,
            state: Some(info.state),
            message,
        }
    }
}
