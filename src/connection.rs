//! Redis connection management
//!
//! This module provides [`RedisStore`], the production [`DependencyStore`].
//! The atomic operations are Lua scripts loaded into the server once, when
//! the store is constructed, so concurrent callers never race to register
//! them on first use.

use crate::cache::config::CacheConfig;
use crate::cache::keys::DEPENDENCY_PATTERN;
use crate::cache::store::{DependencyStore, ScriptId};
use crate::cache::types::{CacheValue, KeyTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of keys requested per `SCAN` round trip
const SCAN_BATCH: usize = 500;

/// Redis-backed dependency store
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    scripts: HashMap<ScriptId, Script>,
}

impl RedisStore {
    /// Connect to Redis and register the atomic operations
    ///
    /// # Example
    /// ```no_run
    /// use clever_cache::RedisStore;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let store = RedisStore::connect("redis://127.0.0.1:6379/0").await?;
    ///     assert!(store.health_check().await?);
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", url);

        let client = redis::Client::open(url)
            .map_err(|e| CacheError::ConfigError(format!("invalid redis url {}: {}", url, e)))?;

        let mut manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::StoreError(e.to_string()))?;

        let scripts = Self::register_scripts(&mut manager).await?;

        info!("Successfully connected to Redis");

        Ok(Self { manager, scripts })
    }

    /// Connect using the store address from `config`
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::connect(&config.redis_url).await
    }

    async fn register_scripts(manager: &mut ConnectionManager) -> Result<HashMap<ScriptId, Script>> {
        let mut scripts = HashMap::new();

        for id in ScriptId::ALL {
            let script = Script::new(id.source());
            let sha: String = redis::cmd("SCRIPT")
                .arg("LOAD")
                .arg(id.source())
                .query_async(manager)
                .await?;

            if sha != script.get_hash() {
                warn!(
                    "Script {} loaded with sha {} but expected {}",
                    id,
                    sha,
                    script.get_hash()
                );
            }
            debug!("Registered script {} ({})", id, sha);
            scripts.insert(id, script);
        }

        Ok(scripts)
    }

    /// Simple health check using PING
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Executing health check (PING)");
        let start = Instant::now();

        let mut conn = self.manager.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;

        debug!("Health check replied {} in {}ms", reply, start.elapsed().as_millis());
        Ok(reply == "PONG")
    }
}

#[async_trait]
impl DependencyStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.manager.clone();
        let value: Option<CacheValue> = conn.get(key).await?;
        Ok(value)
    }

    async fn run_atomic(
        &self,
        script: ScriptId,
        keys: &[String],
        args: &[String],
    ) -> Result<Vec<String>> {
        let registered = self.scripts.get(&script).ok_or_else(|| {
            CacheError::ScriptError(format!("script {} was not registered", script))
        })?;

        let mut invocation = registered.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let mut conn = self.manager.clone();
        let reply: Vec<String> = invocation.invoke_async(&mut conn).await?;
        debug!(script = %script, keys = keys.len(), reply = reply.len(), "Atomic operation completed");
        Ok(reply)
    }

    async fn scan_dependency_keys(&self) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(DEPENDENCY_PATTERN)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut members: Vec<String> = conn.smembers(key).await?;
        members.sort();
        Ok(members)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.manager.clone();
        let ttl: i64 = conn.ttl(key).await?;
        Ok(KeyTtl::from_redis_seconds(ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = RedisStore::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(CacheError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_store_error() {
        let result = RedisStore::connect("redis://127.0.0.1:1/0").await;
        assert!(matches!(result, Err(CacheError::StoreError(_))));
    }
}
