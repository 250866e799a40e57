//! In-memory fakes for tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils`
//! feature, for downstream test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkguard_domain::{LinkGuardError, Result};
use parking_lot::Mutex;

use crate::ports::{ConnectionProbe, NotificationSink, StateBackend};
use crate::store::{StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    hashes: HashMap<String, BTreeMap<String, String>>,
    sorted: HashMap<String, Vec<(f64, String)>>,
    values: HashMap<String, String>,
    ttls: HashMap<String, Duration>,
}

/// Backend that keeps everything in process memory.
///
/// TTLs are recorded but never enforced. Failures and latency can be
/// injected to exercise error paths.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    failing_hash_writes: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make hash writes fail while reads and the event log keep working.
    pub fn set_failing_hash_writes(&self, failing: bool) {
        self.failing_hash_writes.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent operation.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// TTL last applied to `key`.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.tables.lock().ttls.get(key).copied()
    }

    async fn gate(&self) -> StoreResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn hash_set(&self, key: &str, field: &str, value: String) -> StoreResult<()> {
        self.gate().await?;
        if self.failing_hash_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("write rejected".into()));
        }
        self.tables
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.gate().await?;
        Ok(self.tables.lock().hashes.get(key).and_then(|hash| hash.get(field).cloned()))
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.gate().await?;
        Ok(self
            .tables
            .lock()
            .hashes
            .get(key)
            .map(|hash| hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> StoreResult<usize> {
        self.gate().await?;
        let mut tables = self.tables.lock();
        let Some(hash) = tables.hashes.get_mut(key) else {
            return Ok(0);
        };
        Ok(fields.iter().filter(|field| hash.remove(field.as_str()).is_some()).count())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.gate().await?;
        let mut tables = self.tables.lock();
        let exists = tables.hashes.contains_key(key)
            || tables.sorted.contains_key(key)
            || tables.values.contains_key(key);
        if exists {
            tables.ttls.insert(key.to_string(), ttl);
        }
        Ok(exists)
    }

    async fn sorted_add(&self, key: &str, score: f64, member: String) -> StoreResult<()> {
        self.gate().await?;
        let mut tables = self.tables.lock();
        let set = tables.sorted.entry(key.to_string()).or_default();
        set.retain(|(_, existing)| *existing != member);
        let position = set.partition_point(|(existing, _)| *existing <= score);
        set.insert(position, (score, member));
        Ok(())
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<String>> {
        self.gate().await?;
        Ok(self
            .tables
            .lock()
            .sorted
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(score, _)| *score >= min && *score <= max)
                    .map(|(_, member)| member.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn sorted_remove_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        self.gate().await?;
        let mut tables = self.tables.lock();
        let Some(set) = tables.sorted.get_mut(key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|(score, _)| *score < min || *score > max);
        Ok(before - set.len())
    }

    async fn set_value(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        self.gate().await?;
        let mut tables = self.tables.lock();
        tables.values.insert(key.to_string(), value);
        match ttl {
            Some(ttl) => tables.ttls.insert(key.to_string(), ttl),
            None => tables.ttls.remove(key),
        };
        Ok(())
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        self.gate().await?;
        Ok(self.tables.lock().values.get(key).cloned())
    }
}

/// Scripted probe outcome.
#[derive(Debug, Clone)]
pub enum ProbeStep {
    Succeed,
    Refuse,
    Error(String),
}

impl ProbeStep {
    fn into_result(self) -> Result<bool> {
        match self {
            Self::Succeed => Ok(true),
            Self::Refuse => Ok(false),
            Self::Error(message) => Err(LinkGuardError::Connection(message)),
        }
    }
}

/// Probe that replays scripted outcomes.
///
/// Once a script runs dry the probe keeps returning its fallback step.
pub struct ScriptedProbe {
    connect_script: Mutex<Vec<ProbeStep>>,
    health_script: Mutex<Vec<ProbeStep>>,
    connect_fallback: ProbeStep,
    health_fallback: ProbeStep,
    connect_calls: AtomicUsize,
    health_calls: AtomicUsize,
    cleanups: AtomicUsize,
}

impl ScriptedProbe {
    #[must_use]
    pub fn new(connect: Vec<ProbeStep>, health: Vec<ProbeStep>) -> Self {
        Self {
            connect_script: Mutex::new(connect.into_iter().rev().collect()),
            health_script: Mutex::new(health.into_iter().rev().collect()),
            connect_fallback: ProbeStep::Succeed,
            health_fallback: ProbeStep::Succeed,
            connect_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_connect_fallback(mut self, step: ProbeStep) -> Self {
        self.connect_fallback = step;
        self
    }

    #[must_use]
    pub fn with_health_fallback(mut self, step: ProbeStep) -> Self {
        self.health_fallback = step;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProbe for ScriptedProbe {
    async fn establish_connection(&self) -> Result<bool> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.connect_script.lock().pop().unwrap_or_else(|| self.connect_fallback.clone());
        step.into_result()
    }

    async fn check_connection_health(&self) -> Result<bool> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.health_script.lock().pop().unwrap_or_else(|| self.health_fallback.clone());
        step.into_result()
    }

    async fn cleanup_connection(&self) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notification sink that records every call.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, bool, String)>>,
    fail: AtomicBool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose deliveries always fail (after being recorded).
    #[must_use]
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn sent(&self) -> Vec<(String, bool, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_connection_notification(
        &self,
        service_name: &str,
        is_connected: bool,
        details: &str,
    ) -> Result<()> {
        self.sent.lock().push((service_name.to_string(), is_connected, details.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkGuardError::Internal("delivery channel unavailable".into()));
        }
        Ok(())
    }
}

/// Convenience constructor for an `Arc<dyn StateBackend>` fake.
#[must_use]
pub fn memory_backend() -> (Arc<MemoryBackend>, Arc<dyn StateBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let dynamic: Arc<dyn StateBackend> = Arc::clone(&backend) as Arc<dyn StateBackend>;
    (backend, dynamic)
}
