//! Suppression engine and the service-facing manager.

use std::collections::BTreeMap;
use std::sync::Arc;

use linkguard_domain::constants::DEFAULT_RECENT_DECISIONS_LIMIT;
use linkguard_domain::{
    AlertType, ServiceType, SuppressionDecision, SuppressionReport, SuppressionRule,
    SuppressionSettings,
};
use tracing::debug;

use super::coordinator::DecisionCoordinator;
use super::error::{SuppressionError, SuppressionResult};
use super::history::SuppressionTracker;
use crate::classifier::{ErrorCategory, ReconnectionErrorClassifier};
use crate::ports::ConnectionStateReader;
use crate::tracker::TrackerResult;

/// Alert/no-alert decisions over live connection state.
pub struct SuppressionEngine {
    reader: Arc<dyn ConnectionStateReader>,
    classifier: Arc<ReconnectionErrorClassifier>,
    coordinator: DecisionCoordinator,
    history: Arc<SuppressionTracker>,
}

impl SuppressionEngine {
    pub fn new(
        rule: SuppressionRule,
        reader: Arc<dyn ConnectionStateReader>,
        classifier: Arc<ReconnectionErrorClassifier>,
    ) -> Self {
        let history = Arc::new(SuppressionTracker::default());
        Self {
            reader,
            classifier,
            coordinator: DecisionCoordinator::new(rule, Arc::clone(&history)),
            history,
        }
    }

    #[must_use]
    pub fn rule(&self) -> &SuppressionRule {
        self.coordinator.rule()
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<ReconnectionErrorClassifier> {
        &self.classifier
    }

    #[must_use]
    pub fn history(&self) -> &SuppressionTracker {
        &self.history
    }

    /// # Errors
    /// Tracker failures while reading connection state.
    pub async fn make_decision(
        &self,
        service_name: &str,
        service_type: ServiceType,
        alert_type: AlertType,
        error_message: Option<&str>,
    ) -> TrackerResult<SuppressionDecision> {
        self.coordinator
            .make_decision(
                self.reader.as_ref(),
                &self.classifier,
                service_name,
                service_type,
                alert_type,
                error_message,
            )
            .await
    }
}

/// Entry point for services deciding whether to send an alert.
///
/// Resolves the service type from the configured mapping, which is separate
/// from (and stricter than) the classifier's own mapping: an unmapped service
/// is a configuration error here.
pub struct AlertSuppressionManager {
    engine: SuppressionEngine,
    service_type_mapping: BTreeMap<String, ServiceType>,
}

impl AlertSuppressionManager {
    pub fn new(
        settings: SuppressionSettings,
        reader: Arc<dyn ConnectionStateReader>,
        classifier: Arc<ReconnectionErrorClassifier>,
    ) -> Self {
        let SuppressionSettings { rule, service_type_mapping } = settings;
        debug!(
            enabled = rule.enabled,
            grace_period_seconds = rule.grace_period_seconds,
            suppressed_types = ?rule.suppressed_alert_types,
            "alert_suppression_manager_initialized"
        );
        Self { engine: SuppressionEngine::new(rule, reader, classifier), service_type_mapping }
    }

    #[must_use]
    pub fn engine(&self) -> &SuppressionEngine {
        &self.engine
    }

    /// Configured type for `service_name`.
    ///
    /// # Errors
    /// `UnmappedService` when the mapping has no entry.
    pub fn resolve_service_type(&self, service_name: &str) -> SuppressionResult<ServiceType> {
        self.service_type_mapping
            .get(service_name)
            .copied()
            .ok_or_else(|| SuppressionError::UnmappedService(service_name.to_string()))
    }

    /// # Errors
    /// Unmapped service, or tracker failure while reading state.
    pub async fn should_suppress_alert(
        &self,
        service_name: &str,
        alert_type: AlertType,
        error_message: Option<&str>,
    ) -> SuppressionResult<SuppressionDecision> {
        let service_type = self.resolve_service_type(service_name)?;
        Ok(self.engine.make_decision(service_name, service_type, alert_type, error_message).await?)
    }

    /// Reason text when the alert would be suppressed, `None` otherwise.
    ///
    /// # Errors
    /// Same as [`should_suppress_alert`](Self::should_suppress_alert).
    pub async fn get_suppression_reason(
        &self,
        service_name: &str,
        alert_type: AlertType,
    ) -> SuppressionResult<Option<String>> {
        let decision = self.should_suppress_alert(service_name, alert_type, None).await?;
        Ok(decision.should_suppress.then_some(decision.reason))
    }

    #[must_use]
    pub fn is_reconnection_error(&self, service_name: &str, error_message: &str) -> bool {
        self.engine.classifier().is_reconnection_error(service_name, error_message)
    }

    #[must_use]
    pub fn classify_error_type(&self, error_message: &str) -> ErrorCategory {
        self.engine.classifier().classify_error_type(error_message)
    }

    #[must_use]
    pub fn get_suppression_statistics(&self) -> SuppressionReport {
        let rule = self.engine.rule();
        SuppressionReport {
            statistics: self.engine.history().statistics(),
            enabled: rule.enabled,
            grace_period_seconds: rule.grace_period_seconds,
            max_suppression_duration_seconds: rule.max_suppression_duration_seconds,
            suppressed_alert_types: rule.suppressed_alert_types.iter().copied().collect(),
        }
    }

    /// Up to `limit` most recent decisions (default 50), oldest first.
    #[must_use]
    pub fn get_recent_decisions(&self, limit: Option<usize>) -> Vec<SuppressionDecision> {
        self.engine.history().get_recent_decisions(limit.unwrap_or(DEFAULT_RECENT_DECISIONS_LIMIT))
    }
}
