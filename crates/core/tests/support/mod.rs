//! Shared fixtures for the core integration suites.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use linkguard_common::MockClock;
use linkguard_core::ports::ConnectionProbe;
use linkguard_core::testing::memory_backend;
use linkguard_core::{ConnectionStateTracker, ConnectionStore};
use linkguard_domain::{LinkGuardError, Result as DomainResult};

pub const T0: f64 = 1_700_000_000.0;

/// Tracker over a fresh in-memory backend, with a clock pinned at [`T0`].
pub fn tracker() -> (Arc<ConnectionStateTracker>, MockClock) {
    let clock = MockClock::at_unix(T0);
    let (_, backend) = memory_backend();
    let store = ConnectionStore::new(backend, Arc::new(clock.clone()));
    (Arc::new(ConnectionStateTracker::new(store)), clock)
}

/// Probe backed by a switch: the link is up while the switch is on.
pub struct SwitchProbe {
    up: AtomicBool,
    connects: AtomicUsize,
}

impl SwitchProbe {
    pub fn new(up: bool) -> Self {
        Self { up: AtomicBool::new(up), connects: AtomicUsize::new(0) }
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProbe for SwitchProbe {
    async fn establish_connection(&self) -> DomainResult<bool> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(LinkGuardError::Connection("connection refused".into()))
        }
    }

    async fn check_connection_health(&self) -> DomainResult<bool> {
        Ok(self.up.load(Ordering::SeqCst))
    }
}
