//! Integration tests against a real Redis server
//!
//! Most tests need a running Redis reachable through `REDIS_URL`
//! (default `redis://127.0.0.1:6379/0`). The container test needs Docker.
//! Run with: cargo test --test redis_integration_test -- --ignored

mod common;

use clever_cache::cache::ScriptId;
use clever_cache::{
    CacheConfig, CacheError, CleverCache, DependencyDescriptor, DependencyStore,
    ForeignKeySnapshot, KeyTtl, MutationObserver, RedisStore,
};
use common::Comment;
use futures::future::join_all;
use std::time::Duration;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string())
}

/// Table name unique to this run, so tests do not share dependency sets
fn table(name: &str) -> String {
    format!("{}{}", name, rand::random::<u32>())
}

async fn redis_cache() -> CleverCache {
    let config = CacheConfig::builder()
        .redis_url(redis_url())
        .key_prefix(format!("test{}:", rand::random::<u32>()))
        .build();
    CleverCache::connect(config)
        .await
        .expect("Failed to connect to Redis")
}

fn sorted(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys
}

#[tokio::test]
#[ignore] // Requires running Redis instance
async fn test_health_check() {
    let store = RedisStore::connect(&redis_url())
        .await
        .expect("Failed to connect to Redis");
    assert!(store.health_check().await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_set_get_invalidate() {
    let cache = redis_cache().await;
    let tag = DependencyDescriptor::instance(table("tag"), 9);

    cache
        .set("foo", "bar", Some(Duration::from_secs(60)), &[tag.clone()])
        .await
        .unwrap();
    assert_eq!(cache.get::<String>("foo").await.unwrap(), Some("bar".to_string()));

    let prefixed = format!("{}foo", cache.config().key_prefix);
    let victims = cache.invalidate_dependents(&[tag.clone()]).await.unwrap();
    assert_eq!(victims, vec![prefixed]);
    assert_eq!(cache.get_raw("foo").await.unwrap(), None);
    assert_eq!(cache.dependency_ttl(&tag).await.unwrap(), KeyTtl::Missing);

    assert!(cache.invalidate_dependents(&[tag]).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_ttl_reconciliation() {
    let cache = redis_cache().await;
    let tag = DependencyDescriptor::of_type(table("tag"));

    cache.set("long", "v", Some(Duration::from_secs(600)), &[tag.clone()]).await.unwrap();
    cache.set("short", "v", Some(Duration::from_secs(10)), &[tag.clone()]).await.unwrap();
    let remaining = cache.dependency_ttl(&tag).await.unwrap().remaining().unwrap();
    assert!(remaining > Duration::from_secs(500));

    cache.set("forever", "v", None, &[tag.clone()]).await.unwrap();
    assert!(cache.dependency_ttl(&tag).await.unwrap().is_persistent());

    cache.invalidate_dependents(&[tag]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_expired_member_collected() {
    let cache = redis_cache().await;
    let tag = DependencyDescriptor::instance(table("tag"), 9);
    let prefix = cache.config().key_prefix.clone();

    cache.set("k", "v", Some(Duration::from_secs(1)), &[tag.clone()]).await.unwrap();
    cache.set("keep", "v", None, &[tag.clone()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(cache.get_raw("k").await.unwrap(), None);

    let report = cache.collect_garbage().await.unwrap();
    assert!(report.sets_scanned >= 1);
    assert!(report.members_pruned >= 1);
    assert_eq!(
        cache.dependency_members(&tag).await.unwrap(),
        vec![format!("{}keep", prefix)]
    );

    cache.invalidate_dependents(&[tag]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_reparenting_on_redis() {
    let cache = redis_cache().await;
    let prefix = cache.config().key_prefix.clone();

    // Comments live under the fixed "post" table; ids keep runs apart
    let old_post = rand::random::<u32>() as u64;
    let new_post = old_post + 1;
    cache
        .set("old", "[]", None, &[DependencyDescriptor::relation("post", old_post, "comments")])
        .await
        .unwrap();
    cache
        .set("new", "[]", None, &[DependencyDescriptor::relation("post", new_post, "comments")])
        .await
        .unwrap();

    let mut comment = Comment {
        id: rand::random::<u32>() as u64,
        post_id: Some(old_post),
        author_id: rand::random::<u32>() as u64,
    };
    let snapshot = ForeignKeySnapshot::capture(&comment);
    comment.post_id = Some(new_post);

    let report = cache.on_update(&comment, Some(&snapshot)).await.unwrap();
    assert_eq!(
        sorted(report.victims),
        vec![format!("{}new", prefix), format!("{}old", prefix)]
    );
}

#[tokio::test]
#[ignore]
async fn test_wrong_type_dependency_key_is_script_error() {
    let cache = redis_cache().await;
    let name = table("tag");
    let tag = DependencyDescriptor::of_type(name.clone());

    // Occupy the dependency key with a string
    let client = redis::Client::open(redis_url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let dep_key = cache.dependency_key(&tag).unwrap();
    redis::cmd("SET")
        .arg(&dep_key)
        .arg("not a set")
        .query_async::<_, ()>(&mut conn)
        .await
        .unwrap();

    let err = cache.set("foo", "bar", None, &[tag]).await.unwrap_err();
    assert!(matches!(err, CacheError::ScriptError(_)));
    assert_eq!(cache.get_raw("foo").await.unwrap(), None);

    redis::cmd("DEL")
        .arg(&dep_key)
        .query_async::<_, ()>(&mut conn)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_entry_key_overlapping_dependency_set_rejected() {
    let cache = redis_cache().await;
    let tag = DependencyDescriptor::of_type(table("tag"));
    let dep_key = cache.dependency_key(&tag).unwrap();

    // The script refuses the overlap on its own, before any write
    let store = RedisStore::connect(&redis_url()).await.unwrap();
    let err = store
        .run_atomic(
            ScriptId::SetWithDependencies,
            &[dep_key.clone(), dep_key.clone()],
            &["v".to_string()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ScriptError(_)));
    assert_eq!(store.ttl(&dep_key).await.unwrap(), KeyTtl::Missing);

    cache.set("other", "v", None, &[tag.clone()]).await.unwrap();
    assert_eq!(cache.invalidate_dependents(&[tag]).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_sweeps_report_each_entry_once() {
    let cache = redis_cache().await;
    let tag = DependencyDescriptor::of_type(table("tag"));

    let writes = (0..20).map(|i| {
        let cache = cache.clone();
        let tag = tag.clone();
        async move { cache.set(&format!("page_{}", i), &i, None, &[tag]).await }
    });
    for result in join_all(writes).await {
        result.unwrap();
    }

    let sweeps = (0..4).map(|_| {
        let cache = cache.clone();
        let tag = tag.clone();
        async move { cache.invalidate_dependents(&[tag]).await }
    });
    let total: usize = join_all(sweeps)
        .await
        .into_iter()
        .map(|r| r.unwrap().len())
        .sum();

    assert_eq!(total, 20);
}

#[tokio::test]
async fn test_connection_refused_is_store_error() {
    let config = CacheConfig::builder()
        .redis_url("redis://127.0.0.1:1/0")
        .build();

    let err = CleverCache::connect(config).await.err().unwrap();
    assert!(err.is_store_error(), "unexpected error: {}", err);
}

mod testcontainers_tests {
    use super::*;
    use testcontainers::clients::Cli;
    use testcontainers_modules::redis::Redis;

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_with_testcontainer() {
        let docker = Cli::default();
        let redis_container = docker.run(Redis::default());
        let port = redis_container.get_host_port_ipv4(6379);

        let config = CacheConfig::builder()
            .redis_url(format!("redis://127.0.0.1:{}/0", port))
            .build();
        let cache = CleverCache::connect(config).await.unwrap();

        let user = DependencyDescriptor::of_type("user");
        cache.set("all_users", "[]", None, &[user.clone()]).await.unwrap();

        let report = cache.on_bulk_mutate("user").await.unwrap();
        assert_eq!(report.victims, vec!["all_users"]);

        let gc = cache.collect_garbage().await.unwrap();
        assert_eq!(gc.members_pruned, 0);
    }
}
