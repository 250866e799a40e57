//! Shared fixtures for the api integration suites.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use linkguard_api::AppContext;
use linkguard_common::MockClock;
use linkguard_core::ports::ConnectionProbe;
use linkguard_domain::{
    LinkGuardError, MonitorConfig, Result, ServiceType, StoreConfig, SuppressionRule,
    SuppressionSettings,
};

pub const T0: f64 = 1_700_000_000.0;

/// In-memory store, default rule, `kalshi` and `weather` mapped.
pub fn config() -> MonitorConfig {
    let service_type_mapping: BTreeMap<String, ServiceType> = [
        ("kalshi".to_string(), ServiceType::Websocket),
        ("weather".to_string(), ServiceType::Rest),
    ]
    .into_iter()
    .collect();
    MonitorConfig {
        suppression: SuppressionSettings { rule: SuppressionRule::default(), service_type_mapping },
        store: StoreConfig::default(),
        connections: Vec::new(),
    }
}

pub fn context() -> (AppContext, MockClock) {
    let clock = MockClock::at_unix(T0);
    let ctx = AppContext::new_with_clock(config(), Arc::new(clock.clone()))
        .expect("in-memory context should build");
    (ctx, clock)
}

/// Probe backed by a switch: the link is up while the switch is on.
pub struct SwitchProbe {
    up: AtomicBool,
}

impl SwitchProbe {
    pub fn new(up: bool) -> Self {
        Self { up: AtomicBool::new(up) }
    }
}

#[async_trait]
impl ConnectionProbe for SwitchProbe {
    async fn establish_connection(&self) -> Result<bool> {
        if self.up.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(LinkGuardError::Connection("connection refused".into()))
        }
    }

    async fn check_connection_health(&self) -> Result<bool> {
        Ok(self.up.load(Ordering::SeqCst))
    }
}
