//! Connection-state commands
//!
//! Thin wrappers over the shared tracker. Optional arguments take the same
//! defaults as the tracker's own API: one hour of event lookback, 24 hours
//! before a record is stale, and the configured grace period.

use std::collections::HashMap;

use linkguard_domain::constants::{DEFAULT_EVENT_LOOKBACK_HOURS, DEFAULT_STALE_STATE_MAX_AGE_HOURS};
use linkguard_domain::{ConnectionState, ConnectionStateInfo, ReconnectionEvent, Result};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Record a state transition for `service_name`.
///
/// Returns whether the store accepted the write.
///
/// # Errors
/// Tracker failures.
pub async fn update_connection_state(
    ctx: &AppContext,
    service_name: &str,
    state: ConnectionState,
    error_context: Option<String>,
    consecutive_failures: u32,
) -> Result<bool> {
    execute_logged("connection::update_connection_state", || async {
        Ok(ctx
            .tracker
            .update_connection_state(service_name, state, error_context, consecutive_failures)
            .await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn get_connection_state(
    ctx: &AppContext,
    service_name: &str,
) -> Result<Option<ConnectionStateInfo>> {
    execute_logged("connection::get_connection_state", || async {
        Ok(ctx.tracker.get_connection_state(service_name).await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn is_service_in_reconnection(ctx: &AppContext, service_name: &str) -> Result<bool> {
    execute_logged("connection::is_service_in_reconnection", || async {
        Ok(ctx.tracker.is_service_in_reconnection(service_name).await?)
    })
    .await
}

/// `grace_period_seconds` defaults to the configured suppression grace period.
///
/// # Errors
/// Tracker failures.
pub async fn is_service_in_grace_period(
    ctx: &AppContext,
    service_name: &str,
    grace_period_seconds: Option<u64>,
) -> Result<bool> {
    let grace = grace_period_seconds.unwrap_or(ctx.config.suppression.rule.grace_period_seconds);
    execute_logged("connection::is_service_in_grace_period", || async {
        Ok(ctx.tracker.is_service_in_grace_period(service_name, grace).await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn get_reconnection_duration(ctx: &AppContext, service_name: &str) -> Result<Option<f64>> {
    execute_logged("connection::get_reconnection_duration", || async {
        Ok(ctx.tracker.get_reconnection_duration(service_name).await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn get_all_connection_states(
    ctx: &AppContext,
) -> Result<HashMap<String, ConnectionStateInfo>> {
    execute_logged("connection::get_all_connection_states", || async {
        Ok(ctx.tracker.get_all_connection_states().await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn get_services_in_reconnection(ctx: &AppContext) -> Result<Vec<String>> {
    execute_logged("connection::get_services_in_reconnection", || async {
        Ok(ctx.tracker.get_services_in_reconnection().await?)
    })
    .await
}

/// Append a free-form event to the service's log. `details` defaults to "".
///
/// # Errors
/// Tracker failures.
pub async fn record_connection_event(
    ctx: &AppContext,
    service_name: &str,
    event_type: &str,
    details: Option<&str>,
) -> Result<()> {
    execute_logged("connection::record_connection_event", || async {
        Ok(ctx
            .tracker
            .record_connection_event(service_name, event_type, details.unwrap_or_default())
            .await?)
    })
    .await
}

/// # Errors
/// Tracker failures.
pub async fn get_recent_connection_events(
    ctx: &AppContext,
    service_name: &str,
    hours_back: Option<u64>,
) -> Result<Vec<ReconnectionEvent>> {
    let hours_back = hours_back.unwrap_or(DEFAULT_EVENT_LOOKBACK_HOURS);
    execute_logged("connection::get_recent_connection_events", || async {
        Ok(ctx.tracker.get_recent_connection_events(service_name, hours_back).await?)
    })
    .await
}

/// Remove records older than `max_age_hours` (default 24). Returns how many
/// went.
///
/// # Errors
/// Tracker failures.
pub async fn cleanup_stale_states(ctx: &AppContext, max_age_hours: Option<u64>) -> Result<usize> {
    let max_age_hours = max_age_hours.unwrap_or(DEFAULT_STALE_STATE_MAX_AGE_HOURS);
    execute_logged("connection::cleanup_stale_states", || async {
        Ok(ctx.tracker.cleanup_stale_states(max_age_hours).await?)
    })
    .await
}
