//! Orchestrates one suppression decision end to end.

use std::sync::Arc;

use linkguard_domain::{AlertType, ServiceType, SuppressionDecision, SuppressionRule};
use tracing::{debug, info};

use super::context::ContextBuilder;
use super::evaluator::AlertEvaluator;
use super::history::SuppressionTracker;
use crate::classifier::ReconnectionErrorClassifier;
use crate::ports::ConnectionStateReader;
use crate::tracker::TrackerResult;

/// Rule gates, context gathering, evaluation and history recording.
#[derive(Debug)]
pub struct DecisionCoordinator {
    rule: SuppressionRule,
    evaluator: AlertEvaluator,
    context_builder: ContextBuilder,
    history: Arc<SuppressionTracker>,
}

impl DecisionCoordinator {
    #[must_use]
    pub fn new(rule: SuppressionRule, history: Arc<SuppressionTracker>) -> Self {
        Self {
            evaluator: AlertEvaluator::new(rule.clone()),
            context_builder: ContextBuilder::new(&rule),
            rule,
            history,
        }
    }

    #[must_use]
    pub fn rule(&self) -> &SuppressionRule {
        &self.rule
    }

    /// Decides whether to suppress `alert_type` for `service_name` and
    /// records the outcome, including the early disabled/unconfigured exits.
    ///
    /// # Errors
    /// Tracker failures while gathering context. Nothing is recorded then.
    pub async fn make_decision(
        &self,
        reader: &dyn ConnectionStateReader,
        classifier: &ReconnectionErrorClassifier,
        service_name: &str,
        service_type: ServiceType,
        alert_type: AlertType,
        error_message: Option<&str>,
    ) -> TrackerResult<SuppressionDecision> {
        let decision = if !self.rule.enabled {
            early_allow(service_name, alert_type, "Alert suppression is disabled".to_string())
        } else if !self.evaluator.is_alert_type_supported(alert_type) {
            early_allow(
                service_name,
                alert_type,
                format!("Alert type {alert_type} not configured for suppression"),
            )
        } else {
            let context = self
                .context_builder
                .build(reader, classifier, service_name, service_type, error_message)
                .await?;
            debug!(service = service_name, ?context, "suppression_context_built");
            self.evaluator.build_decision(service_name, alert_type, &context, error_message)
        };

        if decision.should_suppress {
            info!(
                service = service_name,
                alert_type = %alert_type,
                reason = %decision.reason,
                "alert_suppressed"
            );
        } else {
            debug!(
                service = service_name,
                alert_type = %alert_type,
                reason = %decision.reason,
                "alert_allowed"
            );
        }
        self.history.record_decision(decision.clone());
        Ok(decision)
    }
}

fn early_allow(service_name: &str, alert_type: AlertType, reason: String) -> SuppressionDecision {
    SuppressionDecision {
        should_suppress: false,
        reason,
        service_name: service_name.to_string(),
        alert_type,
        suppression_duration_seconds: None,
        grace_period_remaining_seconds: None,
    }
}
