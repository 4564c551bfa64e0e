//! Dependency descriptor types
//!
//! A [`DependencyDescriptor`] names the data a cached entry was derived from,
//! at one of three granularities: a whole entity type, a single instance, or
//! the collection of children reachable from an instance through a relation.

use crate::error::{CacheError, Result};
use crate::schema::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// What a cache entry depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencyDescriptor {
    /// Any instance of the table
    EntityType { table: String },
    /// One specific instance
    EntityInstance { table: String, id: String },
    /// The children of one instance reached through `relation`
    EntityRelation {
        table: String,
        id: String,
        relation: String,
    },
}

impl DependencyDescriptor {
    /// Depend on every instance of `table`
    pub fn of_type(table: impl Into<String>) -> Self {
        DependencyDescriptor::EntityType {
            table: table.into(),
        }
    }

    /// Depend on a single instance
    pub fn instance(table: impl Into<String>, id: impl ToString) -> Self {
        DependencyDescriptor::EntityInstance {
            table: table.into(),
            id: id.to_string(),
        }
    }

    /// Depend on the related collection `relation` of instance (`table`, `id`)
    pub fn relation(table: impl Into<String>, id: impl ToString, relation: impl Into<String>) -> Self {
        DependencyDescriptor::EntityRelation {
            table: table.into(),
            id: id.to_string(),
            relation: relation.into(),
        }
    }

    /// Depend on the type of a loaded entity
    pub fn type_of(entity: &dyn Entity) -> Self {
        Self::of_type(entity.table())
    }

    /// Depend on a loaded entity
    pub fn of(entity: &dyn Entity) -> Self {
        Self::instance(entity.table(), entity.id())
    }

    /// Depend on a related collection of a loaded entity, e.g. a post's comments
    pub fn related(entity: &dyn Entity, relation: impl Into<String>) -> Self {
        Self::relation(entity.table(), entity.id(), relation)
    }

    /// Table the descriptor refers to
    pub fn table(&self) -> &str {
        match self {
            DependencyDescriptor::EntityType { table }
            | DependencyDescriptor::EntityInstance { table, .. }
            | DependencyDescriptor::EntityRelation { table, .. } => table,
        }
    }

    /// Granularity name, matching the serialized `kind` tag
    pub fn kind(&self) -> &'static str {
        match self {
            DependencyDescriptor::EntityType { .. } => "entity_type",
            DependencyDescriptor::EntityInstance { .. } => "entity_instance",
            DependencyDescriptor::EntityRelation { .. } => "entity_relation",
        }
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyDescriptor::EntityType { table } => write!(f, "{}", table),
            DependencyDescriptor::EntityInstance { table, id } => write!(f, "{}#{}", table, id),
            DependencyDescriptor::EntityRelation {
                table,
                id,
                relation,
            } => write!(f, "{}#{}.{}", table, id, relation),
        }
    }
}

/// Decode a descriptor from an untyped value, e.g. one received over the wire.
///
/// Anything that is not a tagged descriptor object is rejected:
///
/// ```
/// use clever_cache::schema::DependencyDescriptor;
/// use serde_json::json;
///
/// assert!(DependencyDescriptor::try_from(json!("biz")).is_err());
///
/// let d = DependencyDescriptor::try_from(json!({"kind": "entity_type", "table": "post"})).unwrap();
/// assert_eq!(d, DependencyDescriptor::of_type("post"));
/// ```
impl TryFrom<JsonValue> for DependencyDescriptor {
    type Error = CacheError;

    fn try_from(value: JsonValue) -> Result<Self> {
        let shown = value.to_string();
        serde_json::from_value(value).map_err(|e| {
            CacheError::InvalidDependencyDescriptor(format!(
                "{} cannot be used as dependency: {}",
                shown, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors() {
        assert_eq!(
            DependencyDescriptor::of_type("post"),
            DependencyDescriptor::EntityType {
                table: "post".to_string()
            }
        );
        assert_eq!(
            DependencyDescriptor::instance("post", 7),
            DependencyDescriptor::EntityInstance {
                table: "post".to_string(),
                id: "7".to_string()
            }
        );
        let rel = DependencyDescriptor::relation("post", 7, "comments");
        assert_eq!(rel.table(), "post");
        assert_eq!(rel.kind(), "entity_relation");
    }

    #[test]
    fn test_display() {
        assert_eq!(DependencyDescriptor::of_type("tag").to_string(), "tag");
        assert_eq!(DependencyDescriptor::instance("tag", 9).to_string(), "tag#9");
        assert_eq!(
            DependencyDescriptor::relation("post", 2, "comments").to_string(),
            "post#2.comments"
        );
    }

    #[test]
    fn test_serde_tagging() {
        let d = DependencyDescriptor::relation("post", 2, "comments");
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["kind"], "entity_relation");
        assert_eq!(value["relation"], "comments");

        let back = DependencyDescriptor::try_from(value).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_untyped_values_rejected() {
        for value in [json!("biz"), json!(42), json!({"table": "post"}), json!({"kind": "entity_instance", "table": "post"})] {
            let err = DependencyDescriptor::try_from(value).unwrap_err();
            assert!(matches!(err, CacheError::InvalidDependencyDescriptor(_)));
        }
    }
}
