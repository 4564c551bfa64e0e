//! High-level entry point tying the cache components together
//!
//! [`CleverCache`] owns one store handle and hands it to the writer, the
//! invalidator and the garbage collector. It also keeps usage statistics and
//! implements [`MutationObserver`] so it can be wired straight into a data
//! layer's post-commit hooks.

use crate::cache::{
    config::CacheConfig,
    gc::{GarbageCollector, GcHandle},
    invalidation::{AssociationAction, InvalidationReport, Invalidator},
    keys::KeyCoder,
    memory::MemoryStore,
    observer::MutationObserver,
    store::DependencyStore,
    types::{CacheKey, CacheStats, CacheValue, GcReport, KeyTtl},
    writer::CacheWriter,
};
use crate::connection::RedisStore;
use crate::error::Result;
use crate::schema::{DependencyDescriptor, Entity, ForeignKeySnapshot};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Dependency-tracked cache
///
/// Cheap to clone; clones share the store connection and statistics.
#[derive(Clone)]
pub struct CleverCache {
    config: CacheConfig,
    coder: KeyCoder,
    store: Arc<dyn DependencyStore>,
    writer: CacheWriter,
    invalidator: Invalidator,
    collector: GarbageCollector,
    stats: Arc<RwLock<CacheStats>>,
}

impl CleverCache {
    /// Build a cache over an existing store
    pub fn new(store: Arc<dyn DependencyStore>, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let coder = KeyCoder::new(config.key_prefix.clone());
        Ok(Self {
            writer: CacheWriter::new(store.clone(), coder.clone(), config.clone()),
            invalidator: Invalidator::new(store.clone(), coder.clone()),
            collector: GarbageCollector::new(store.clone()),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            config,
            coder,
            store,
        })
    }

    /// Build a cache backed by a process-local [`MemoryStore`]
    pub fn in_memory(config: CacheConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Connect to the Redis server named by `config.redis_url`
    ///
    /// # Example
    /// ```no_run
    /// use clever_cache::{CacheConfig, CleverCache};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let cache = CleverCache::connect(CacheConfig::from_env()?).await?;
    ///     let report = cache.collect_garbage().await?;
    ///     println!("pruned {} members", report.members_pruned);
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        let store = RedisStore::from_config(&config).await?;
        Self::new(Arc::new(store), config)
    }

    /// Serialize `value` as JSON and store it, linked to `dependencies`
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        self.writer.set(key, value, ttl, dependencies).await?;
        self.stats.write().await.writes += 1;
        Ok(())
    }

    /// Store with the configured default TTL
    pub async fn set_with_default_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        self.writer
            .set_with_default_ttl(key, value, dependencies)
            .await?;
        self.stats.write().await.writes += 1;
        Ok(())
    }

    /// Store an already serialized value
    pub async fn set_raw(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        self.writer.set_raw(key, value, ttl, dependencies).await?;
        self.stats.write().await.writes += 1;
        Ok(())
    }

    /// Fetch and deserialize an entry
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Fetch an entry's stored string
    pub async fn get_raw(&self, key: &str) -> Result<Option<CacheValue>> {
        let cache_key = self.coder.cache_key(key);
        let value = self.store.get(&cache_key).await?;

        let mut stats = self.stats.write().await;
        if value.is_some() {
            stats.hits += 1;
        } else {
            debug!("Cache miss for {}", cache_key);
            stats.misses += 1;
        }

        Ok(value)
    }

    /// Delete every entry depending on any of `descriptors`
    pub async fn invalidate_dependents(
        &self,
        descriptors: &[DependencyDescriptor],
    ) -> Result<Vec<CacheKey>> {
        let victims = self.invalidator.invalidate_dependents(descriptors).await?;
        if !descriptors.is_empty() {
            self.record_sweep(victims.len()).await;
        }
        Ok(victims)
    }

    /// Run one garbage-collection pass
    pub async fn collect_garbage(&self) -> Result<GcReport> {
        let report = self.collector.collect_garbage().await?;

        let mut stats = self.stats.write().await;
        stats.gc_runs += 1;
        stats.members_pruned += report.members_pruned as u64;

        Ok(report)
    }

    /// Spawn periodic garbage collection when `enable_auto_gc` is set.
    ///
    /// Must be called from within a tokio runtime. Background passes are not
    /// counted in [`CleverCache::stats`].
    pub fn start_background_gc(&self) -> Option<GcHandle> {
        if !self.config.enable_auto_gc {
            return None;
        }
        Some(self.collector.spawn_periodic(self.config.gc_interval))
    }

    /// Store key of the dependency set for `descriptor`
    pub fn dependency_key(&self, descriptor: &DependencyDescriptor) -> Result<String> {
        self.coder.dependency_key(descriptor)
    }

    /// Entry keys currently listed under `descriptor`, sorted
    pub async fn dependency_members(&self, descriptor: &DependencyDescriptor) -> Result<Vec<String>> {
        let key = self.coder.dependency_key(descriptor)?;
        self.store.members(&key).await
    }

    /// Remaining lifetime of the dependency set for `descriptor`
    pub async fn dependency_ttl(&self, descriptor: &DependencyDescriptor) -> Result<KeyTtl> {
        let key = self.coder.dependency_key(descriptor)?;
        self.store.ttl(&key).await
    }

    /// Remaining lifetime of the entry stored under `key`
    pub async fn entry_ttl(&self, key: &str) -> Result<KeyTtl> {
        self.store.ttl(&self.coder.cache_key(key)).await
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key_coder(&self) -> &KeyCoder {
        &self.coder
    }

    pub fn store(&self) -> Arc<dyn DependencyStore> {
        self.store.clone()
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Snapshot of usage statistics
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    pub async fn reset_stats(&self) {
        *self.stats.write().await = CacheStats::default();
        info!("Cache statistics reset");
    }

    async fn record_sweep(&self, victims: usize) {
        let mut stats = self.stats.write().await;
        stats.invalidations += 1;
        stats.entries_invalidated += victims as u64;
    }

    async fn record(&self, report: InvalidationReport) -> InvalidationReport {
        if !report.dependency_keys.is_empty() {
            self.record_sweep(report.victim_count()).await;
        }
        report
    }
}

#[async_trait]
impl MutationObserver for CleverCache {
    async fn on_create(&self, entity: &dyn Entity) -> Result<InvalidationReport> {
        let report = self.invalidator.on_create(entity).await?;
        Ok(self.record(report).await)
    }

    async fn on_update(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport> {
        let report = self.invalidator.on_update(entity, snapshot).await?;
        Ok(self.record(report).await)
    }

    async fn on_delete(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport> {
        let report = self.invalidator.on_delete(entity, snapshot).await?;
        Ok(self.record(report).await)
    }

    async fn on_bulk_mutate(&self, table: &str) -> Result<InvalidationReport> {
        let report = self.invalidator.on_bulk_mutate(table).await?;
        Ok(self.record(report).await)
    }

    async fn on_association_change(
        &self,
        owner: &dyn Entity,
        related_table: &str,
        action: &AssociationAction,
    ) -> Result<InvalidationReport> {
        let report = self
            .invalidator
            .on_association_change(owner, related_table, action)
            .await?;
        Ok(self.record(report).await)
    }
}
