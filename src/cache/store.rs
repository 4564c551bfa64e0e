//! Store client abstraction
//!
//! A [`DependencyStore`] is the only component that talks to the backing
//! key-value store. Everything that must be atomic goes through
//! [`DependencyStore::run_atomic`], which the store executes as one
//! indivisible unit relative to other atomic operations.

use crate::cache::scripts;
use crate::cache::types::{CacheValue, KeyTtl};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// The three server-side atomic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptId {
    /// keys `[entry_key, dep_key...]`, args `[value, ttl_seconds?]`
    SetWithDependencies,
    /// keys `[dep_key...]`, returns deleted entry keys
    InvalidateDependents,
    /// keys `[dep_key]`, returns pruned members of that one set
    CollectGarbage,
}

impl ScriptId {
    /// Every script, in registration order
    pub const ALL: [ScriptId; 3] = [
        ScriptId::SetWithDependencies,
        ScriptId::InvalidateDependents,
        ScriptId::CollectGarbage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScriptId::SetWithDependencies => "set_with_dependencies",
            ScriptId::InvalidateDependents => "invalidate_dependents",
            ScriptId::CollectGarbage => "collect_garbage",
        }
    }

    /// Lua source executed by script-capable stores
    pub fn source(&self) -> &'static str {
        match self {
            ScriptId::SetWithDependencies => scripts::SET_WITH_DEPENDENCIES,
            ScriptId::InvalidateDependents => scripts::INVALIDATE_DEPENDENTS,
            ScriptId::CollectGarbage => scripts::PRUNE_DEPENDENCY_SET,
        }
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backing store for cache entries and dependency sets.
///
/// Implementations must register their atomic operations when they are
/// constructed, before the store is shared between tasks.
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Read a stored value. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Execute one atomic operation over `keys` with `args`
    async fn run_atomic(&self, script: ScriptId, keys: &[String], args: &[String])
        -> Result<Vec<String>>;

    /// List every key in the dependency namespace
    async fn scan_dependency_keys(&self) -> Result<Vec<String>>;

    /// Members of a dependency set, empty when the set does not exist
    async fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Remaining lifetime of any key
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_names_unique() {
        let names: std::collections::HashSet<_> = ScriptId::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), ScriptId::ALL.len());
        assert_eq!(ScriptId::CollectGarbage.to_string(), "collect_garbage");
    }

    #[test]
    fn test_script_sources() {
        assert!(ScriptId::SetWithDependencies.source().contains("SADD"));
        assert!(ScriptId::InvalidateDependents.source().contains("SUNION"));
        assert!(ScriptId::CollectGarbage.source().contains("SREM"));
    }
}
