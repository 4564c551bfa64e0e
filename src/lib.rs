//! # Clever Cache (clever-cache)
//!
//! Dependency-tracked caching over Redis: entries are linked to the data they
//! were derived from and removed atomically when that data changes.
//!
//! ## Features
//!
//! - Dependencies on whole entity types, single instances, or a parent's related rows
//! - Atomic write-and-link and atomic invalidation through server-side scripts
//! - Mutation hooks that expand creates, updates, deletes and association changes
//! - Garbage collection of dependency sets, on demand or in the background
//! - In-memory store with identical semantics for tests
//!
//! ## Caching a Query Result
//!
//! ```no_run
//! use clever_cache::{CacheConfig, CleverCache, DependencyDescriptor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CleverCache::connect(CacheConfig::from_env()?).await?;
//!
//!     // Comments of post 2, rebuilt when any of them changes
//!     cache
//!         .set(
//!             "post_2_comments",
//!             &vec!["first!", "nice post"],
//!             Some(Duration::from_secs(600)),
//!             &[DependencyDescriptor::relation("post", 2, "comments")],
//!         )
//!         .await?;
//!
//!     let comments: Option<Vec<String>> = cache.get("post_2_comments").await?;
//!     println!("cached: {:?}", comments);
//!     Ok(())
//! }
//! ```
//!
//! ## Reacting to Mutations
//!
//! ```no_run
//! use clever_cache::{CacheConfig, CleverCache, Entity, ForeignKey, ForeignKeySnapshot, MutationObserver};
//!
//! struct Comment {
//!     id: u64,
//!     post_id: u64,
//! }
//!
//! impl Entity for Comment {
//!     fn table(&self) -> &str {
//!         "comment"
//!     }
//!
//!     fn id(&self) -> String {
//!         self.id.to_string()
//!     }
//!
//!     fn foreign_keys(&self) -> Vec<ForeignKey> {
//!         vec![ForeignKey::new("post_id", "post", "comments", Some(self.post_id))]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CleverCache::connect(CacheConfig::default()).await?;
//!
//!     let mut comment = Comment { id: 5, post_id: 2 };
//!     let snapshot = ForeignKeySnapshot::capture(&comment);
//!     comment.post_id = 1;
//!
//!     // Both post 1 and post 2 lose their cached comment lists
//!     let report = cache.on_update(&comment, Some(&snapshot)).await?;
//!     println!("{}: {} entries removed", report.reason, report.victim_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Garbage Collection
//!
//! ```no_run
//! use clever_cache::{CacheConfig, CleverCache};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::builder()
//!         .enable_auto_gc(true)
//!         .gc_interval(Duration::from_secs(300))
//!         .build();
//!     let cache = CleverCache::connect(config).await?;
//!
//!     let handle = cache.start_background_gc();
//!     // ...
//!     if let Some(handle) = handle {
//!         handle.shutdown().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod schema;

// Re-export main types for convenience
pub use cache::{
    AssociationAction, CacheConfig, CacheConfigBuilder, CacheKey, CacheStats, CacheValue,
    CacheWriter, CleverCache, DependencyStore, DescriptorClosure, GarbageCollector, GcHandle,
    GcReport, InvalidationReason, InvalidationReport, Invalidator, KeyCoder, KeyTtl, MemoryStore,
    MutationObserver,
};
pub use connection::RedisStore;
pub use error::{CacheError, Result};
pub use schema::{DependencyDescriptor, Entity, ForeignKey, ForeignKeySnapshot};
