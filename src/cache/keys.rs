//! Key coding for cache entries and dependency sets
//!
//! Entry keys live under the configured namespace prefix. Dependency keys
//! live under the shared `deps:` namespace:
//!
//! | descriptor                     | key                             |
//! |--------------------------------|---------------------------------|
//! | `EntityType(post)`             | `deps:post`                     |
//! | `EntityInstance(post, 2)`      | `deps:post_2`                   |
//! | `EntityRelation(post, 2, rel)` | `deps:post_2_rel`               |

use crate::cache::types::CacheKey;
use crate::error::{CacheError, Result};
use crate::schema::DependencyDescriptor;
use std::collections::HashSet;

/// Namespace shared by every dependency set
pub const DEPENDENCY_NAMESPACE: &str = "deps:";

/// Glob matching every dependency key
pub const DEPENDENCY_PATTERN: &str = "deps:*";

/// Maps raw keys and descriptors to store keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCoder {
    prefix: String,
}

impl KeyCoder {
    /// Create a coder that namespaces entry keys with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Namespace a raw application key
    ///
    /// ```
    /// use clever_cache::cache::KeyCoder;
    ///
    /// let coder = KeyCoder::new("app:");
    /// assert_eq!(coder.cache_key("posts_all"), "app:posts_all");
    /// ```
    pub fn cache_key(&self, raw_key: &str) -> CacheKey {
        format!("{}{}", self.prefix, raw_key)
    }

    /// Code a descriptor into its dependency-set key
    ///
    /// ```
    /// use clever_cache::cache::KeyCoder;
    /// use clever_cache::schema::DependencyDescriptor;
    ///
    /// let coder = KeyCoder::default();
    /// let key = coder.dependency_key(&DependencyDescriptor::relation("post", 2, "comments")).unwrap();
    /// assert_eq!(key, "deps:post_2_comments");
    /// ```
    pub fn dependency_key(&self, descriptor: &DependencyDescriptor) -> Result<String> {
        let key = match descriptor {
            DependencyDescriptor::EntityType { table } => {
                check_component(descriptor, "table", table)?;
                format!("{}{}", DEPENDENCY_NAMESPACE, table)
            }
            DependencyDescriptor::EntityInstance { table, id } => {
                check_component(descriptor, "table", table)?;
                check_component(descriptor, "id", id)?;
                format!("{}{}_{}", DEPENDENCY_NAMESPACE, table, id)
            }
            DependencyDescriptor::EntityRelation {
                table,
                id,
                relation,
            } => {
                check_component(descriptor, "table", table)?;
                check_component(descriptor, "id", id)?;
                check_component(descriptor, "relation", relation)?;
                format!("{}{}_{}_{}", DEPENDENCY_NAMESPACE, table, id, relation)
            }
        };
        Ok(key)
    }

    /// Code several descriptors, dropping duplicate keys and keeping first-seen order.
    ///
    /// Fails on the first invalid descriptor without coding the rest.
    pub fn dependency_keys<'a, I>(&self, descriptors: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a DependencyDescriptor>,
    {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for descriptor in descriptors {
            let key = self.dependency_key(descriptor)?;
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Whether a store key belongs to the dependency namespace
    pub fn is_dependency_key(key: &str) -> bool {
        key.starts_with(DEPENDENCY_NAMESPACE)
    }
}

fn check_component(descriptor: &DependencyDescriptor, name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CacheError::InvalidDependencyDescriptor(format!(
            "{} descriptor has an empty {}",
            descriptor.kind(),
            name
        )));
    }
    if value.contains(':') || value.chars().any(char::is_whitespace) {
        return Err(CacheError::InvalidDependencyDescriptor(format!(
            "{} {:?} of {} descriptor contains ':' or whitespace",
            name,
            value,
            descriptor.kind()
        )));
    }
    Ok(())
}
