//! Alerting and suppression types

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_GRACE_PERIOD_SECONDS, DEFAULT_MAX_SUPPRESSION_DURATION_SECONDS};
use crate::errors::LinkGuardError;

/* -------------------------------------------------------------------------- */
/* Alert Type */
/* -------------------------------------------------------------------------- */

/// Category of a monitoring alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ErrorLog,
    StaleLog,
    MessageMetrics,
    HealthCheck,
    ProcessStatus,
    Recovery,
    SystemResources,
    ConnectionError,
    Timeout,
}

impl AlertType {
    pub const ALL: [Self; 9] = [
        Self::ErrorLog,
        Self::StaleLog,
        Self::MessageMetrics,
        Self::HealthCheck,
        Self::ProcessStatus,
        Self::Recovery,
        Self::SystemResources,
        Self::ConnectionError,
        Self::Timeout,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorLog => "error_log",
            Self::StaleLog => "stale_log",
            Self::MessageMetrics => "message_metrics",
            Self::HealthCheck => "health_check",
            Self::ProcessStatus => "process_status",
            Self::Recovery => "recovery",
            Self::SystemResources => "system_resources",
            Self::ConnectionError => "connection_error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = LinkGuardError;

    /// Accepts `error_log` as well as `ERROR_LOG`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|alert| alert.as_str() == normalized)
            .ok_or_else(|| LinkGuardError::Config(format!("unknown alert type: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Service Type */
/* -------------------------------------------------------------------------- */

/// Transport family of a service, used to pick its error-pattern bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Websocket,
    Rest,
    Database,
    Scraper,
    Unknown,
}

impl ServiceType {
    pub const ALL: [Self; 5] =
        [Self::Websocket, Self::Rest, Self::Database, Self::Scraper, Self::Unknown];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Rest => "rest",
            Self::Database => "database",
            Self::Scraper => "scraper",
            Self::Unknown => "unknown",
        }
    }

    /// Case-insensitive lookup. Empty, unrecognised and `"unknown"` inputs
    /// all yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .filter(|kind| *kind != Self::Unknown)
            .find(|kind| kind.as_str() == normalized)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* -------------------------------------------------------------------------- */
/* Suppression Rule */
/* -------------------------------------------------------------------------- */

/// Immutable suppression policy, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub enabled: bool,
    pub grace_period_seconds: u64,
    pub suppressed_alert_types: BTreeSet<AlertType>,
    pub require_reconnection_error_pattern: bool,
    pub max_suppression_duration_seconds: u64,
}

impl SuppressionRule {
    #[must_use]
    pub fn suppresses(&self, alert_type: AlertType) -> bool {
        self.suppressed_alert_types.contains(&alert_type)
    }
}

impl Default for SuppressionRule {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_period_seconds: DEFAULT_GRACE_PERIOD_SECONDS,
            suppressed_alert_types: [AlertType::ErrorLog, AlertType::StaleLog, AlertType::MessageMetrics]
                .into_iter()
                .collect(),
            require_reconnection_error_pattern: true,
            max_suppression_duration_seconds: DEFAULT_MAX_SUPPRESSION_DURATION_SECONDS,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Decisions */
/* -------------------------------------------------------------------------- */

/// Connection facts gathered for a single suppression decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionContext {
    pub service_type: ServiceType,
    pub is_in_reconnection: bool,
    pub is_in_grace_period: bool,
    pub reconnection_duration: Option<f64>,
    pub grace_period_remaining_seconds: Option<f64>,
    pub is_reconnection_error: bool,
}

/// Outcome of a suppression decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionDecision {
    pub should_suppress: bool,
    pub reason: String,
    pub service_name: String,
    pub alert_type: AlertType,
    pub suppression_duration_seconds: Option<f64>,
    pub grace_period_remaining_seconds: Option<f64>,
}

/// Total and suppressed counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTally {
    pub total: u64,
    pub suppressed: u64,
}

impl DecisionTally {
    pub fn record(&mut self, suppressed: bool) {
        self.total += 1;
        if suppressed {
            self.suppressed += 1;
        }
    }
}

/// Aggregate over the retained decision history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuppressionStatistics {
    pub total_decisions: u64,
    pub suppressed_count: u64,
    /// `suppressed_count / total_decisions`, or `0.0` with no history.
    pub suppression_rate: f64,
    pub by_service: BTreeMap<String, DecisionTally>,
    pub by_alert_type: BTreeMap<AlertType, DecisionTally>,
}

/// Statistics plus the rule they were produced under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionReport {
    #[serde(flatten)]
    pub statistics: SuppressionStatistics,
    pub enabled: bool,
    pub grace_period_seconds: u64,
    pub max_suppression_duration_seconds: u64,
    pub suppressed_alert_types: Vec<AlertType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_type_strings_round_trip() {
        for alert in AlertType::ALL {
            assert_eq!(alert.as_str().parse::<AlertType>().unwrap(), alert);
            assert_eq!(serde_json::to_value(alert).unwrap(), alert.as_str());
        }
        assert_eq!("ERROR_LOG".parse::<AlertType>().unwrap(), AlertType::ErrorLog);
        assert!(matches!("bogus".parse::<AlertType>(), Err(LinkGuardError::Config(_))));
    }

    /// Validates service-type parsing treats "unknown" like a miss.
    #[test]
    fn service_type_parse_rules() {
        assert_eq!(ServiceType::parse("WebSocket"), Some(ServiceType::Websocket));
        assert_eq!(ServiceType::parse("rest"), Some(ServiceType::Rest));
        assert_eq!(ServiceType::parse("unknown"), None);
        assert_eq!(ServiceType::parse(""), None);
        assert_eq!(ServiceType::parse("grpc"), None);
    }

    /// Validates the default rule.
    ///
    /// Assertions:
    /// - Enabled with a 300s grace period and 1800s cap.
    /// - Suppresses log/metric alerts but not recovery alerts.
    #[test]
    fn default_rule() {
        let rule = SuppressionRule::default();
        assert!(rule.enabled);
        assert_eq!(rule.grace_period_seconds, 300);
        assert_eq!(rule.max_suppression_duration_seconds, 1800);
        assert!(rule.require_reconnection_error_pattern);
        assert!(rule.suppresses(AlertType::ErrorLog));
        assert!(rule.suppresses(AlertType::StaleLog));
        assert!(rule.suppresses(AlertType::MessageMetrics));
        assert!(!rule.suppresses(AlertType::Recovery));
    }

    #[test]
    fn statistics_serialize_alert_types_as_keys() {
        let mut stats = SuppressionStatistics::default();
        stats.by_alert_type.entry(AlertType::ErrorLog).or_default().record(true);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_alert_type"]["error_log"]["total"], 1);
        assert_eq!(json["by_alert_type"]["error_log"]["suppressed"], 1);
    }
}
