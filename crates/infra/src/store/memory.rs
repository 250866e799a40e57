//! In-process state backend with enforced TTLs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use linkguard_common::time::Clock;
use linkguard_core::ports::StateBackend;
use linkguard_core::store::{StoreError, StoreResult};

enum Slot {
    Hash(BTreeMap<String, String>),
    Sorted(Vec<(f64, String)>),
    Value(String),
}

impl Slot {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Hash(_) => "hash",
            Self::Sorted(_) => "sorted set",
            Self::Value(_) => "value",
        }
    }
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    const fn new(slot: Slot) -> Self {
        Self { slot, expires_at: None }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Keyed map with hash, sorted-set and value slots.
///
/// Expired keys are dropped on access and by [`purge_expired`]. Visible
/// only to the current process.
///
/// [`purge_expired`]: InMemoryStateBackend::purge_expired
pub struct InMemoryStateBackend {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStateBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    /// Live keys, expired ones excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|entry| !entry.is_expired(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired key, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    fn evict_if_expired(&self, key: &str) {
        let now = self.clock.now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn with_slot<T>(
        &self,
        key: &str,
        create: impl FnOnce() -> Slot,
        apply: impl FnOnce(&mut Slot) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.evict_if_expired(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry::new(create()));
        apply(&mut entry.slot)
    }

    fn read<T>(
        &self,
        key: &str,
        absent: T,
        apply: impl FnOnce(&Slot) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.evict_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => apply(&entry.slot),
            None => Ok(absent),
        }
    }

    /// Removes `key` once its collection is empty.
    fn drop_if_empty(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| match &entry.slot {
            Slot::Hash(hash) => hash.is_empty(),
            Slot::Sorted(set) => set.is_empty(),
            Slot::Value(_) => false,
        });
    }
}

fn wrong_type(key: &str, expected: &str, found: &Slot) -> StoreError {
    StoreError::Backend(format!(
        "WRONGTYPE key '{key}' holds a {} where a {expected} was expected",
        found.kind()
    ))
}

#[async_trait]
impl StateBackend for InMemoryStateBackend {
    async fn hash_set(&self, key: &str, field: &str, value: String) -> StoreResult<()> {
        self.with_slot(key, || Slot::Hash(BTreeMap::new()), |slot| match slot {
            Slot::Hash(hash) => {
                hash.insert(field.to_string(), value);
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.read(key, None, |slot| match slot {
            Slot::Hash(hash) => Ok(hash.get(field).cloned()),
            other => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.read(key, HashMap::new(), |slot| match slot {
            Slot::Hash(hash) => Ok(hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            other => Err(wrong_type(key, "hash", other)),
        })
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> StoreResult<usize> {
        self.evict_if_expired(key);
        let removed = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.slot {
                Slot::Hash(hash) => {
                    fields.iter().filter(|field| hash.remove(field.as_str()).is_some()).count()
                }
                other => return Err(wrong_type(key, "hash", other)),
            },
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.evict_if_expired(key);
        let deadline = self.clock.now() + ttl;
        Ok(self.entries.get_mut(key).map(|mut entry| entry.expires_at = Some(deadline)).is_some())
    }

    async fn sorted_add(&self, key: &str, score: f64, member: String) -> StoreResult<()> {
        self.with_slot(key, || Slot::Sorted(Vec::new()), |slot| match slot {
            Slot::Sorted(set) => {
                set.retain(|(_, existing)| *existing != member);
                let position = set.partition_point(|(existing, _)| *existing <= score);
                set.insert(position, (score, member));
                Ok(())
            }
            other => Err(wrong_type(key, "sorted set", other)),
        })
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<String>> {
        self.read(key, Vec::new(), |slot| match slot {
            Slot::Sorted(set) => Ok(set
                .iter()
                .filter(|(score, _)| *score >= min && *score <= max)
                .map(|(_, member)| member.clone())
                .collect()),
            other => Err(wrong_type(key, "sorted set", other)),
        })
    }

    async fn sorted_remove_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        self.evict_if_expired(key);
        let removed = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.slot {
                Slot::Sorted(set) => {
                    let before = set.len();
                    set.retain(|(score, _)| *score < min || *score > max);
                    before - set.len()
                }
                other => return Err(wrong_type(key, "sorted set", other)),
            },
            None => 0,
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    async fn set_value(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        self.entries.insert(key.to_string(), Entry { slot: Slot::Value(value), expires_at });
        Ok(())
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        self.read(key, None, |slot| match slot {
            Slot::Value(value) => Ok(Some(value.clone())),
            other => Err(wrong_type(key, "value", other)),
        })
    }
}
