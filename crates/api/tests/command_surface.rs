//! The inbound commands over one context, as a service would call them.

mod support;

use linkguard_api::{
    cleanup_stale_states, get_all_connection_states, get_connection_state,
    get_recent_connection_events, get_recent_decisions, get_reconnection_duration,
    get_services_in_reconnection, get_suppression_reason, get_suppression_statistics,
    is_service_in_grace_period, is_service_in_reconnection, make_suppression_decision,
    record_connection_event, update_connection_state,
};
use linkguard_domain::{AlertType, ConnectionState, LinkGuardError};

/// Validates an outage as seen through the command surface.
///
/// Assertions:
/// - Reconnection status, duration and grace period track the transitions.
/// - Alerts are suppressed during the outage and after recovery.
/// - Decisions show up in the statistics and history.
#[tokio::test]
async fn outage_through_commands() {
    let (ctx, clock) = support::context();

    assert!(update_connection_state(&ctx, "kalshi", ConnectionState::Ready, None, 0).await.unwrap());
    clock.advance_secs(600.0);
    assert!(!is_service_in_grace_period(&ctx, "kalshi", None).await.unwrap());

    update_connection_state(
        &ctx,
        "kalshi",
        ConnectionState::Disconnected,
        Some("websocket closed".into()),
        1,
    )
    .await
    .unwrap();
    clock.advance_secs(20.0);

    assert!(is_service_in_reconnection(&ctx, "kalshi").await.unwrap());
    assert_eq!(get_services_in_reconnection(&ctx).await.unwrap(), vec!["kalshi".to_string()]);
    assert_eq!(get_reconnection_duration(&ctx, "kalshi").await.unwrap(), Some(20.0));

    let during = make_suppression_decision(
        &ctx,
        "kalshi",
        AlertType::ErrorLog,
        Some("websocket connection closed"),
    )
    .await
    .unwrap();
    assert!(during.should_suppress);

    update_connection_state(&ctx, "kalshi", ConnectionState::Ready, None, 0).await.unwrap();
    clock.advance_secs(10.0);

    assert_eq!(get_reconnection_duration(&ctx, "kalshi").await.unwrap(), None);
    assert!(is_service_in_grace_period(&ctx, "kalshi", None).await.unwrap());
    assert!(!is_service_in_grace_period(&ctx, "kalshi", Some(5)).await.unwrap());

    let reason = get_suppression_reason(&ctx, "kalshi", AlertType::StaleLog).await.unwrap();
    assert!(reason.is_some_and(|r| r.contains("grace period")));

    let events = get_recent_connection_events(&ctx, "kalshi", None).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].details, "Reconnection successful after 20.0s");

    let report = get_suppression_statistics(&ctx);
    assert_eq!(report.statistics.total_decisions, 2);
    assert_eq!(report.statistics.suppressed_count, 2);
    assert_eq!(report.grace_period_seconds, 300);
    assert_eq!(get_recent_decisions(&ctx, Some(1)).len(), 1);
    assert_eq!(get_recent_decisions(&ctx, None).len(), 2);
}

#[tokio::test]
async fn unmapped_service_is_a_config_error() {
    let (ctx, _clock) = support::context();
    let err = make_suppression_decision(&ctx, "mystery", AlertType::ErrorLog, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LinkGuardError::Config(ref message) if message.contains("mystery")));
}

#[tokio::test]
async fn events_and_cleanup() {
    let (ctx, clock) = support::context();

    record_connection_event(&ctx, "weather", "manual_restart", None).await.unwrap();
    let events = get_recent_connection_events(&ctx, "weather", Some(1)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "manual_restart");
    assert_eq!(events[0].details, "");

    update_connection_state(&ctx, "weather", ConnectionState::Ready, None, 0).await.unwrap();
    clock.advance_secs(2.0 * 3600.0);
    update_connection_state(&ctx, "kalshi", ConnectionState::Ready, None, 0).await.unwrap();

    assert_eq!(cleanup_stale_states(&ctx, Some(1)).await.unwrap(), 1);
    assert!(get_connection_state(&ctx, "weather").await.unwrap().is_none());
    assert_eq!(get_all_connection_states(&ctx).await.unwrap().len(), 1);
    assert_eq!(cleanup_stale_states(&ctx, None).await.unwrap(), 0);
}
