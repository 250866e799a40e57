//! The process-wide context is built once, even under concurrent first use.
//!
//! Kept in its own test binary so no other test touches the global.

use std::sync::Arc;

use linkguard_api::global_context;
use tempfile::TempDir;

#[tokio::test]
async fn concurrent_first_use_shares_one_context() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("linkguard.json");
    std::fs::write(
        &path,
        r#"{
            "alert_suppression": {
                "enabled": true,
                "grace_period_seconds": 120,
                "suppression_rules": {
                    "during_reconnection": ["error_log"],
                    "service_type_mapping": {"kalshi": "websocket"}
                }
            }
        }"#,
    )
    .unwrap();
    std::env::set_var("LINKGUARD_CONFIG_PATH", &path);

    let (first, second) = tokio::join!(global_context(), global_context());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.config.suppression.rule.grace_period_seconds, 120);
    assert!(Arc::ptr_eq(&first, &global_context().await.unwrap()));
}
