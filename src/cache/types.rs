//! Core type definitions for the cache system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Coded cache key, as stored in the backing store
pub type CacheKey = String;

/// Serialized cache value
pub type CacheValue = String;

/// Remaining lifetime of a store key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists and never expires
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Map a Redis `TTL` reply (-2 missing, -1 persistent, seconds otherwise)
    pub fn from_redis_seconds(ttl: i64) -> Self {
        match ttl {
            -2 => KeyTtl::Missing,
            t if t < 0 => KeyTtl::Persistent,
            t => KeyTtl::Expires(Duration::from_secs(t as u64)),
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, KeyTtl::Missing)
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, KeyTtl::Persistent)
    }

    /// Remaining lifetime, `None` for missing or persistent keys
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Outcome of one garbage-collection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcReport {
    /// Number of dependency sets examined
    pub sets_scanned: usize,

    /// Number of stale members removed across all sets
    pub members_pruned: usize,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl GcReport {
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Statistics for cache usage monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries written with dependencies
    pub writes: u64,

    /// Number of invalidation sweeps that reached the store
    pub invalidations: u64,

    /// Number of entries deleted by invalidation sweeps
    pub entries_invalidated: u64,

    /// Number of garbage-collection passes
    pub gc_runs: u64,

    /// Number of stale dependency-set members pruned
    pub members_pruned: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Average number of entries removed per invalidation sweep
    pub fn avg_victims_per_invalidation(&self) -> f64 {
        if self.invalidations == 0 {
            0.0
        } else {
            self.entries_invalidated as f64 / self.invalidations as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, invalidations: {}, invalidated: {}, pruned: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.invalidations,
            self.entries_invalidated,
            self.members_pruned
        )
    }
}
