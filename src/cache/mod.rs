//! # Dependency-Tracked Cache
//!
//! Cached entries declare which data they were derived from. Each dependency
//! is a set in the store listing the entries built from it. When the data
//! changes, every entry in the affected sets is deleted in one atomic step.
//!
//! ## Components
//!
//! - **Key coding**: [`KeyCoder`] maps descriptors onto the `deps:` namespace
//! - **Writing**: [`CacheWriter`] stores an entry and joins it to its sets
//! - **Invalidation**: [`Invalidator`] expands mutations into descriptor closures and sweeps them
//! - **Garbage collection**: [`GarbageCollector`] prunes members whose entries expired
//! - **Stores**: [`MemoryStore`] for tests and single processes, `RedisStore` for shared deployments
//!
//! ## Example
//!
//! ```rust
//! use clever_cache::cache::{CacheConfig, CleverCache};
//! use clever_cache::DependencyDescriptor;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = CleverCache::in_memory(CacheConfig::default())?;
//!
//! let tags = DependencyDescriptor::of_type("tag");
//! cache.set("tag_names", &["rust", "redis"], None, &[tags.clone()]).await?;
//!
//! // A tag changed
//! let victims = cache.invalidate_dependents(&[tags]).await?;
//! assert_eq!(victims, vec!["tag_names".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gc;
pub mod integration;
pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod observer;
pub mod scripts;
pub mod store;
pub mod types;
pub mod writer;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use gc::{GarbageCollector, GcHandle};
pub use integration::CleverCache;
pub use invalidation::{
    AssociationAction, DescriptorClosure, InvalidationReason, InvalidationReport, Invalidator,
};
pub use keys::{KeyCoder, DEPENDENCY_NAMESPACE};
pub use memory::MemoryStore;
pub use observer::MutationObserver;
pub use store::{DependencyStore, ScriptId};
pub use types::{CacheKey, CacheStats, CacheValue, GcReport, KeyTtl};
pub use writer::CacheWriter;
