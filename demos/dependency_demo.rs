//! Dependency Cache Demo
//!
//! Walks through caching blog queries and invalidating them as the
//! underlying rows change, using the in-memory store.
//!
//! Usage:
//!   cargo run --example dependency_demo
//!
//! Set RUST_LOG=clever_cache=debug to see every write and sweep.

use clever_cache::{
    AssociationAction, CacheConfig, CleverCache, DependencyDescriptor, Entity, ForeignKey,
    ForeignKeySnapshot, MutationObserver,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Post {
    id: u64,
    author_id: u64,
}

impl Entity for Post {
    fn table(&self) -> &str {
        "post"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![ForeignKey::new("author_id", "user", "posts", Some(self.author_id))]
    }
}

struct Comment {
    id: u64,
    post_id: u64,
}

impl Entity for Comment {
    fn table(&self) -> &str {
        "comment"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![ForeignKey::new("post_id", "post", "comments", Some(self.post_id))]
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CommentList {
    post_id: u64,
    comment_ids: Vec<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== Dependency Cache Demo ===");

    let config = CacheConfig::builder()
        .key_prefix("demo:")
        .default_ttl(Duration::from_secs(600))
        .build();
    let cache = CleverCache::in_memory(config)?;

    // 1. Cache some query results
    println!("1. Caching query results...");
    for post_id in [1, 2] {
        let list = CommentList {
            post_id,
            comment_ids: vec![post_id * 10],
        };
        cache
            .set_with_default_ttl(
                &format!("post_{}_comments", post_id),
                &list,
                &[DependencyDescriptor::relation("post", post_id, "comments")],
            )
            .await?;
    }
    cache
        .set("tag_cloud", &["rust", "redis"], None, &[DependencyDescriptor::of_type("tag")])
        .await?;
    println!("   Cached post_1_comments, post_2_comments, tag_cloud\n");

    // 2. Move a comment between posts
    println!("2. Moving comment 20 from post 2 to post 1...");
    let mut comment = Comment { id: 20, post_id: 2 };
    let snapshot = ForeignKeySnapshot::capture(&comment);
    comment.post_id = 1;
    let report = cache.on_update(&comment, Some(&snapshot)).await?;
    println!("   {}: removed {:?}\n", report.reason, report.victims);

    // 3. Unrelated entries survive
    println!("3. Checking unrelated entries...");
    let cloud: Option<Vec<String>> = cache.get("tag_cloud").await?;
    println!("   tag_cloud still cached: {:?}\n", cloud);

    // 4. Tag a post
    println!("4. Tagging post 1...");
    let post = Post { id: 1, author_id: 7 };
    let report = cache
        .on_association_change(&post, "tag", &AssociationAction::Add(vec!["3".to_string()]))
        .await?;
    println!("   {}: removed {:?}\n", report.reason, report.victims);

    // 5. Let a short-lived entry expire and collect its membership
    println!("5. Expiring an entry and collecting garbage...");
    cache
        .set(
            "user_7_posts",
            &[1u64],
            Some(Duration::from_secs(1)),
            &[DependencyDescriptor::relation("user", 7, "posts")],
        )
        .await?;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let gc = cache.collect_garbage().await?;
    println!(
        "   Scanned {} sets, pruned {} members\n",
        gc.sets_scanned, gc.members_pruned
    );

    println!("{}", cache.stats().await);

    Ok(())
}
