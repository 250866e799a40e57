//! Alert suppression commands

use linkguard_domain::{AlertType, Result, SuppressionDecision, SuppressionReport};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Decide whether an alert for `service_name` should be held back.
///
/// The decision is recorded in the suppression history.
///
/// # Errors
/// - `Config` when the service has no configured service type
/// - `Tracker` when connection state cannot be read
pub async fn make_suppression_decision(
    ctx: &AppContext,
    service_name: &str,
    alert_type: AlertType,
    error_message: Option<&str>,
) -> Result<SuppressionDecision> {
    execute_logged("suppression::make_suppression_decision", || async {
        Ok(ctx.suppression.should_suppress_alert(service_name, alert_type, error_message).await?)
    })
    .await
}

/// Reason text when an alert would be suppressed right now.
///
/// # Errors
/// Same as [`make_suppression_decision`].
pub async fn get_suppression_reason(
    ctx: &AppContext,
    service_name: &str,
    alert_type: AlertType,
) -> Result<Option<String>> {
    execute_logged("suppression::get_suppression_reason", || async {
        Ok(ctx.suppression.get_suppression_reason(service_name, alert_type).await?)
    })
    .await
}

pub fn get_suppression_statistics(ctx: &AppContext) -> SuppressionReport {
    ctx.suppression.get_suppression_statistics()
}

/// Most recent decisions, oldest first. `limit` defaults to 50.
pub fn get_recent_decisions(ctx: &AppContext, limit: Option<usize>) -> Vec<SuppressionDecision> {
    ctx.suppression.get_recent_decisions(limit)
}
