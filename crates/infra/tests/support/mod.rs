//! Shared fixtures for the infra integration suites.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use linkguard_common::MockClock;
use linkguard_core::ConnectionStateTracker;
use linkguard_domain::StoreConfig;
use linkguard_infra::open_store;
use tempfile::TempDir;

pub const T0: f64 = 1_700_000_000.0;

/// SQLite file that outlives every handle opened on it during a test.
pub struct SharedDatabase {
    pub clock: MockClock,
    path: PathBuf,
    _dir: TempDir,
}

impl SharedDatabase {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let path = dir.path().join("linkguard.db");
        Self { clock: MockClock::at_unix(T0), path, _dir: dir }
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            sqlite_path: Some(self.path.display().to_string()),
            pool_size: 2,
            ..StoreConfig::default()
        }
    }

    /// A fresh tracker over its own pool, as a separate process would have.
    pub fn tracker(&self) -> ConnectionStateTracker {
        self.tracker_with(self.config())
    }

    pub fn tracker_with(&self, config: StoreConfig) -> ConnectionStateTracker {
        let store = open_store(&config, Arc::new(self.clock.clone()))
            .expect("sqlite store should open");
        ConnectionStateTracker::new(store)
    }
}
