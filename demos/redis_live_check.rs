//! Live check against a Redis server
//!
//! Connects using the environment configuration, verifies the server
//! responds, then runs one write, invalidation and GC pass.
//!
//! Usage:
//!   cargo run --example redis_live_check
//!
//! Environment variables (a `.env` file is read if present):
//!   CLEVER_CACHE_REDIS_URL  - Redis URL (default: redis://127.0.0.1:6379/0)
//!   CLEVER_CACHE_KEY_PREFIX - prefix for entry keys (default: none)

use clever_cache::{CacheConfig, CleverCache, DependencyDescriptor, RedisStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = CacheConfig::from_env()?;
    info!("Checking Redis at {}", config.redis_url);

    let store = match RedisStore::from_config(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Connection failed: {}", e);
            return Err(e.into());
        }
    };

    if !store.health_check().await? {
        anyhow::bail!("Redis did not answer PING");
    }
    info!("✓ Redis is healthy");

    let cache = CleverCache::new(Arc::new(store), config)?;
    let probe = DependencyDescriptor::instance("live_check", std::process::id());

    cache
        .set("live_check", "ok", Some(Duration::from_secs(30)), &[probe.clone()])
        .await?;
    let value: Option<String> = cache.get("live_check").await?;
    info!("✓ Round trip returned {:?}", value);

    let victims = cache.invalidate_dependents(&[probe]).await?;
    info!("✓ Invalidation removed {:?}", victims);

    let report = cache.collect_garbage().await?;
    info!(
        "✓ GC scanned {} sets and pruned {} members in {}ms",
        report.sets_scanned,
        report.members_pruned,
        report.duration().as_millis()
    );

    Ok(())
}
