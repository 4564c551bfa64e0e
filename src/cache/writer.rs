//! Writing entries linked to their dependencies

use crate::cache::config::CacheConfig;
use crate::cache::keys::KeyCoder;
use crate::cache::store::{DependencyStore, ScriptId};
use crate::cache::types::CacheValue;
use crate::error::{CacheError, Result};
use crate::schema::DependencyDescriptor;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Stores entries and registers them in their dependency sets atomically
#[derive(Clone)]
pub struct CacheWriter {
    store: Arc<dyn DependencyStore>,
    coder: KeyCoder,
    config: CacheConfig,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn DependencyStore>, coder: KeyCoder, config: CacheConfig) -> Self {
        Self {
            store,
            coder,
            config,
        }
    }

    /// Serialize `value` as JSON and store it under `key`.
    ///
    /// `ttl` of `None` stores a persistent entry. Every descriptor is coded
    /// before the store is contacted, so an invalid descriptor writes nothing.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.set_raw(key, payload, ttl, dependencies).await
    }

    /// Like [`CacheWriter::set`] with the configured default TTL and jitter
    pub async fn set_with_default_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        let ttl = self.config.ttl_with_jitter();
        self.set(key, value, Some(ttl), dependencies).await
    }

    /// Store an already serialized value
    pub async fn set_raw(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
        dependencies: &[DependencyDescriptor],
    ) -> Result<()> {
        let cache_key = self.coder.cache_key(key);
        if KeyCoder::is_dependency_key(&cache_key) {
            return Err(CacheError::InvalidKey(format!(
                "{} lies in the dependency namespace",
                cache_key
            )));
        }
        let dependency_keys = self.coder.dependency_keys(dependencies)?;

        let mut args = vec![value];
        if let Some(ttl) = ttl {
            args.push(ttl_seconds(ttl)?.to_string());
        }

        debug!(
            key = %cache_key,
            ttl = ?ttl,
            depends_on = ?dependency_keys,
            "cache_set"
        );

        let mut keys = Vec::with_capacity(dependency_keys.len() + 1);
        keys.push(cache_key);
        keys.extend(dependency_keys);

        self.store
            .run_atomic(ScriptId::SetWithDependencies, &keys, &args)
            .await?;
        Ok(())
    }
}

/// Longest TTL accepted, 100 years; keeps the store's absolute expiry in range
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Whole seconds for the store, rounded up so an entry never expires early
pub fn ttl_seconds(ttl: Duration) -> Result<u64> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(
            "a zero TTL cannot be stored; use None for a persistent entry".to_string(),
        ));
    }
    let secs = ttl.as_secs();
    let secs = if ttl.subsec_nanos() > 0 {
        secs.checked_add(1)
    } else {
        Some(secs)
    };
    match secs {
        Some(secs) if secs <= MAX_TTL_SECS => Ok(secs),
        _ => Err(CacheError::InvalidTtl(format!(
            "{:?} exceeds the maximum of {} seconds",
            ttl, MAX_TTL_SECS
        ))),
    }
}
