//! Rule evaluation over a prepared [`SuppressionContext`].

use linkguard_domain::{AlertType, SuppressionContext, SuppressionDecision, SuppressionRule};

const REASON_SEPARATOR: &str = "; ";

/// Outcome of the ordered suppression checks, before it becomes a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub should_suppress: bool,
    pub reason_parts: Vec<String>,
}

impl Evaluation {
    fn suppress(reason_parts: Vec<String>) -> Self {
        Self { should_suppress: true, reason_parts }
    }

    fn allow(reason_parts: Vec<String>) -> Self {
        Self { should_suppress: false, reason_parts }
    }

    /// Human-readable reason with the suppress/allow prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        let prefix = if self.should_suppress { "Alert suppressed" } else { "Alert not suppressed" };
        format!("{prefix}: {}", self.reason_parts.join(REASON_SEPARATOR))
    }
}

/// Applies a [`SuppressionRule`] to connection facts.
///
/// Checks run in priority order and the first that fires decides:
/// reconnection-pattern errors, redundant recovery alerts, active
/// reconnection (bounded by the max suppression duration), then the
/// post-reconnection grace period.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    rule: SuppressionRule,
}

impl AlertEvaluator {
    #[must_use]
    pub fn new(rule: SuppressionRule) -> Self {
        Self { rule }
    }

    #[must_use]
    pub fn rule(&self) -> &SuppressionRule {
        &self.rule
    }

    #[must_use]
    pub fn is_alert_type_supported(&self, alert_type: AlertType) -> bool {
        self.rule.suppresses(alert_type)
    }

    #[must_use]
    pub fn evaluate(
        &self,
        alert_type: AlertType,
        context: &SuppressionContext,
        error_message: Option<&str>,
    ) -> Evaluation {
        let has_message = error_message.is_some_and(|message| !message.is_empty());
        if context.is_reconnection_error && has_message {
            return Evaluation::suppress(vec!["error matches reconnection pattern".to_string()]);
        }

        if let Some(parts) = evaluate_recovery_alert(alert_type, context) {
            return Evaluation::suppress(parts);
        }

        if context.is_in_reconnection {
            return self.evaluate_during_reconnection(context);
        }

        if context.is_in_grace_period {
            let mut part = "service is in post-reconnection grace period".to_string();
            if let Some(remaining) = context.grace_period_remaining_seconds {
                part.push_str(&format!(" (remaining: {remaining:.1}s)"));
            }
            return Evaluation::suppress(vec![part]);
        }

        Evaluation::allow(vec!["no suppression conditions met".to_string()])
    }

    fn evaluate_during_reconnection(&self, context: &SuppressionContext) -> Evaluation {
        let max = self.rule.max_suppression_duration_seconds;
        match context.reconnection_duration {
            #[allow(clippy::cast_precision_loss)]
            Some(duration) if duration > max as f64 => Evaluation::allow(vec![format!(
                "reconnection duration {duration:.1}s exceeds max suppression time {max}s"
            )]),
            Some(duration) => Evaluation::suppress(vec![format!(
                "service is in reconnection mode (duration: {duration:.1}s)"
            )]),
            None => Evaluation::suppress(vec!["service is in reconnection mode".to_string()]),
        }
    }

    /// Full decision for `service_name` from the evaluated context.
    #[must_use]
    pub fn build_decision(
        &self,
        service_name: &str,
        alert_type: AlertType,
        context: &SuppressionContext,
        error_message: Option<&str>,
    ) -> SuppressionDecision {
        let evaluation = self.evaluate(alert_type, context, error_message);
        SuppressionDecision {
            should_suppress: evaluation.should_suppress,
            reason: evaluation.reason(),
            service_name: service_name.to_string(),
            alert_type,
            suppression_duration_seconds: context.reconnection_duration,
            grace_period_remaining_seconds: context.grace_period_remaining_seconds,
        }
    }
}

fn evaluate_recovery_alert(
    alert_type: AlertType,
    context: &SuppressionContext,
) -> Option<Vec<String>> {
    if alert_type != AlertType::Recovery {
        return None;
    }
    let phase = if context.is_in_reconnection {
        "service in reconnection mode"
    } else if context.is_in_grace_period {
        "service in post-reconnection grace period"
    } else {
        return None;
    };
    Some(vec![
        phase.to_string(),
        "recovery notification suppressed to avoid redundancy".to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use linkguard_domain::ServiceType;

    use super::*;

    fn context() -> SuppressionContext {
        SuppressionContext {
            service_type: ServiceType::Websocket,
            is_in_reconnection: false,
            is_in_grace_period: false,
            reconnection_duration: None,
            grace_period_remaining_seconds: None,
            is_reconnection_error: false,
        }
    }

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::new(SuppressionRule::default())
    }

    #[test]
    fn pattern_match_wins_when_message_present() {
        let ctx = SuppressionContext { is_reconnection_error: true, ..context() };
        let decision =
            evaluator().build_decision("kalshi", AlertType::ErrorLog, &ctx, Some("Connection timeout"));
        assert!(decision.should_suppress);
        assert_eq!(decision.reason, "Alert suppressed: error matches reconnection pattern");
        assert_eq!(decision.service_name, "kalshi");

        let without_message = evaluator().evaluate(AlertType::ErrorLog, &ctx, None);
        assert!(!without_message.should_suppress);
    }

    #[test]
    fn recovery_alerts_name_the_phase() {
        let reconnecting = SuppressionContext {
            is_in_reconnection: true,
            is_in_grace_period: true,
            reconnection_duration: Some(30.0),
            ..context()
        };
        let decision = evaluator().build_decision("weather", AlertType::Recovery, &reconnecting, None);
        assert!(decision.should_suppress);
        assert!(decision.reason.contains("service in reconnection mode"));
        assert!(decision.reason.contains("recovery notification suppressed to avoid redundancy"));

        let grace = SuppressionContext { is_in_grace_period: true, ..context() };
        let evaluation = evaluator().evaluate(AlertType::Recovery, &grace, None);
        assert!(evaluation.should_suppress);
        assert!(evaluation.reason().contains("post-reconnection grace period"));

        assert_eq!(evaluate_recovery_alert(AlertType::Recovery, &context()), None);
    }

    /// Validates the max suppression duration is a strict upper bound and the
    /// duration is rendered with one decimal place.
    #[test]
    fn reconnection_is_bounded_by_max_duration() {
        let mut ctx = SuppressionContext {
            is_in_reconnection: true,
            is_in_grace_period: true,
            reconnection_duration: Some(300.0),
            ..context()
        };
        let within = evaluator().evaluate(AlertType::ErrorLog, &ctx, None);
        assert!(within.should_suppress);
        assert_eq!(
            within.reason(),
            "Alert suppressed: service is in reconnection mode (duration: 300.0s)"
        );

        ctx.reconnection_duration = Some(1800.0);
        assert!(evaluator().evaluate(AlertType::ErrorLog, &ctx, None).should_suppress);

        ctx.reconnection_duration = Some(2000.0);
        let exceeded = evaluator().evaluate(AlertType::ErrorLog, &ctx, None);
        assert!(!exceeded.should_suppress);
        assert!(exceeded.reason().contains("exceeds max suppression time 1800s"));

        ctx.reconnection_duration = None;
        let unknown = evaluator().evaluate(AlertType::ErrorLog, &ctx, None);
        assert_eq!(unknown.reason(), "Alert suppressed: service is in reconnection mode");
    }

    #[test]
    fn grace_period_carries_remaining_time() {
        let ctx = SuppressionContext {
            is_in_grace_period: true,
            grace_period_remaining_seconds: Some(150.0),
            ..context()
        };
        let decision = evaluator().build_decision("deribit", AlertType::ErrorLog, &ctx, None);
        assert!(decision.should_suppress);
        assert!(decision.reason.contains("post-reconnection grace period"));
        assert_eq!(decision.grace_period_remaining_seconds, Some(150.0));
    }

    #[test]
    fn nothing_matches() {
        let decision = evaluator().build_decision("kalshi", AlertType::ErrorLog, &context(), None);
        assert!(!decision.should_suppress);
        assert_eq!(decision.reason, "Alert not suppressed: no suppression conditions met");
        assert!(evaluator().is_alert_type_supported(AlertType::StaleLog));
        assert!(!evaluator().is_alert_type_supported(AlertType::Recovery));
    }
}
