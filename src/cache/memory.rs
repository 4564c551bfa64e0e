//! In-process dependency store
//!
//! [`MemoryStore`] implements the same atomic operations as the Redis store,
//! with each operation running under a single write lock. Expired keys are
//! dropped lazily whenever they are touched, mirroring Redis semantics closely
//! enough for tests and single-process deployments.

use crate::cache::keys::KeyCoder;
use crate::cache::store::{DependencyStore, ScriptId};
use crate::cache::types::{CacheValue, KeyTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Keyspace>>,
}

#[derive(Default)]
struct Keyspace {
    slots: HashMap<String, Slot>,
}

struct Slot {
    data: SlotData,
    expires_at: Option<Instant>,
}

enum SlotData {
    Value(CacheValue),
    Set(BTreeSet<String>),
}

impl SlotData {
    fn type_name(&self) -> &'static str {
        match self {
            SlotData::Value(_) => "string",
            SlotData::Set(_) => "set",
        }
    }
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }

    fn ttl(&self, now: Instant) -> KeyTtl {
        match self.expires_at {
            Some(at) => KeyTtl::Expires(at.saturating_duration_since(now)),
            None => KeyTtl::Persistent,
        }
    }
}

impl Keyspace {
    /// Drop `key` if it has expired, then return it
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Slot> {
        if self.slots.get(key).map_or(false, |slot| slot.is_expired(now)) {
            self.slots.remove(key);
        }
        self.slots.get_mut(key)
    }

    fn exists(&mut self, key: &str, now: Instant) -> bool {
        self.live(key, now).is_some()
    }

    fn ttl(&mut self, key: &str, now: Instant) -> KeyTtl {
        self.live(key, now)
            .map_or(KeyTtl::Missing, |slot| slot.ttl(now))
    }

    /// Reject keys that exist but are not sets
    fn check_set(&mut self, key: &str, now: Instant) -> Result<()> {
        match self.live(key, now) {
            Some(Slot {
                data: SlotData::Value(_),
                ..
            }) => Err(CacheError::ScriptError(format!(
                "WRONGTYPE dependency key {} holds a string",
                key
            ))),
            _ => Ok(()),
        }
    }

    fn set_members(&mut self, key: &str, now: Instant) -> Option<&mut BTreeSet<String>> {
        match self.live(key, now) {
            Some(Slot {
                data: SlotData::Set(members),
                ..
            }) => Some(members),
            _ => None,
        }
    }

    fn set_with_dependencies(&mut self, keys: &[String], args: &[String]) -> Result<Vec<String>> {
        let (entry_key, dep_keys) = keys.split_first().ok_or_else(|| {
            CacheError::ScriptError("set_with_dependencies requires an entry key".to_string())
        })?;
        let value = args.first().ok_or_else(|| {
            CacheError::ScriptError("set_with_dependencies requires a value".to_string())
        })?;
        let ttl = match args.get(1) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => return Err(CacheError::ScriptError(format!("ERR invalid ttl {}", raw))),
            },
            None => None,
        };

        if KeyCoder::is_dependency_key(entry_key) || dep_keys.contains(entry_key) {
            return Err(CacheError::ScriptError(format!(
                "ERR entry key {} overlaps the dependency namespace",
                entry_key
            )));
        }

        let now = Instant::now();
        let expires_at = match ttl {
            Some(ttl) => Some(now.checked_add(ttl).ok_or_else(|| {
                CacheError::ScriptError(format!("ERR invalid ttl {}", ttl.as_secs()))
            })?),
            None => None,
        };
        for dep_key in dep_keys {
            self.check_set(dep_key, now)?;
        }

        self.slots.insert(
            entry_key.clone(),
            Slot {
                data: SlotData::Value(value.clone()),
                expires_at,
            },
        );

        for dep_key in dep_keys {
            let previous_ttl = self.ttl(dep_key, now);
            let slot = self.slots.entry(dep_key.clone()).or_insert_with(|| Slot {
                data: SlotData::Set(BTreeSet::new()),
                expires_at: None,
            });
            if let SlotData::Set(members) = &mut slot.data {
                members.insert(entry_key.clone());
            }

            match (ttl, previous_ttl) {
                (Some(_), KeyTtl::Missing) => slot.expires_at = expires_at,
                (Some(ttl), KeyTtl::Expires(remaining)) if remaining < ttl => {
                    slot.expires_at = expires_at
                }
                (None, KeyTtl::Expires(_)) => slot.expires_at = None,
                _ => {}
            }
        }

        Ok(Vec::new())
    }

    fn invalidate_dependents(&mut self, keys: &[String]) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Err(CacheError::ScriptError(
                "invalidate_dependents requires at least one dependency key".to_string(),
            ));
        }

        let now = Instant::now();
        for dep_key in keys {
            self.check_set(dep_key, now)?;
        }

        let mut victims = BTreeSet::new();
        for dep_key in keys {
            if let Some(members) = self.set_members(dep_key, now) {
                victims.extend(members.iter().cloned());
            }
        }

        for victim in &victims {
            self.slots.remove(victim);
        }
        for dep_key in keys {
            self.slots.remove(dep_key);
        }

        Ok(victims.into_iter().collect())
    }

    fn prune_dependency_set(&mut self, keys: &[String]) -> Result<Vec<String>> {
        let [dep_key] = keys else {
            return Err(CacheError::ScriptError(format!(
                "collect_garbage takes exactly one dependency key, got {}",
                keys.len()
            )));
        };

        let now = Instant::now();
        let members: Vec<String> = match self.set_members(dep_key, now) {
            Some(members) => members.iter().cloned().collect(),
            None => return Ok(Vec::new()),
        };

        let stale: Vec<String> = members
            .into_iter()
            .filter(|member| !self.exists(member, now))
            .collect();

        if let Some(members) = self.set_members(dep_key, now) {
            for member in &stale {
                members.remove(member);
            }
        }

        Ok(stale)
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, entries and dependency sets together
    pub async fn len(&self) -> usize {
        let mut keyspace = self.inner.write().await;
        let now = Instant::now();
        keyspace.slots.retain(|_, slot| !slot.is_expired(now));
        keyspace.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every key
    pub async fn clear(&self) {
        let mut keyspace = self.inner.write().await;
        let count = keyspace.slots.len();
        keyspace.slots.clear();
        debug!("Cleared {} keys from memory store", count);
    }

    /// Store a plain value without dependencies.
    ///
    /// A TTL past the range of the monotonic clock never expires.
    pub async fn put_raw(&self, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let mut keyspace = self.inner.write().await;
        let now = Instant::now();
        keyspace.slots.insert(
            key.to_string(),
            Slot {
                data: SlotData::Value(value),
                expires_at: ttl.and_then(|d| now.checked_add(d)),
            },
        );
    }
}

#[async_trait]
impl DependencyStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut keyspace = self.inner.write().await;
        match keyspace.live(key, Instant::now()) {
            Some(Slot {
                data: SlotData::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(slot) => Err(CacheError::ScriptError(format!(
                "WRONGTYPE key {} holds a {}",
                key,
                slot.data.type_name()
            ))),
            None => Ok(None),
        }
    }

    async fn run_atomic(
        &self,
        script: ScriptId,
        keys: &[String],
        args: &[String],
    ) -> Result<Vec<String>> {
        let mut keyspace = self.inner.write().await;
        debug!(script = %script, keys = keys.len(), "Running atomic operation in memory");
        match script {
            ScriptId::SetWithDependencies => keyspace.set_with_dependencies(keys, args),
            ScriptId::InvalidateDependents => keyspace.invalidate_dependents(keys),
            ScriptId::CollectGarbage => keyspace.prune_dependency_set(keys),
        }
    }

    async fn scan_dependency_keys(&self) -> Result<Vec<String>> {
        let mut keyspace = self.inner.write().await;
        let now = Instant::now();
        keyspace.slots.retain(|_, slot| !slot.is_expired(now));
        let mut keys: Vec<String> = keyspace
            .slots
            .keys()
            .filter(|key| KeyCoder::is_dependency_key(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut keyspace = self.inner.write().await;
        let now = Instant::now();
        keyspace.check_set(key, now)?;
        Ok(keyspace
            .set_members(key, now)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut keyspace = self.inner.write().await;
        Ok(keyspace.ttl(key, Instant::now()))
    }
}
