//! Health command for dashboards and probes

use crate::context::AppContext;
use crate::utils::health::HealthStatus;

/// Monitor health summary
///
/// # Example Response
/// ```json
/// {
///   "is_healthy": false,
///   "score": 0.5,
///   "message": "unhealthy: kalshi",
///   "components": [
///     { "name": "store", "is_healthy": true, "state": null, "message": null },
///     { "name": "kalshi", "is_healthy": false, "state": "reconnecting", "message": "reconnecting" }
///   ],
///   "checked_at": "2023-11-14T22:13:20Z"
/// }
/// ```
pub async fn get_monitor_health(ctx: &AppContext) -> HealthStatus {
    ctx.health_check().await
}
