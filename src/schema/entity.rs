//! Entity model consumed by the invalidation closure
//!
//! The surrounding data layer describes its rows through [`Entity`]. Foreign
//! keys are reported with the relation name the parent uses for its children,
//! so a change to a child can be mapped to the parent's cached collection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A persisted row the cache can depend on
pub trait Entity: Send + Sync {
    /// Table (type) name, used as the first component of dependency keys
    fn table(&self) -> &str;

    /// Primary key rendered as a string
    fn id(&self) -> String;

    /// Foreign keys with their current parent ids
    fn foreign_keys(&self) -> Vec<ForeignKey> {
        Vec::new()
    }
}

/// A foreign-key attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Attribute name on the child, e.g. `post_id`
    pub attname: String,
    /// Table of the parent entity
    pub parent_table: String,
    /// Name of the parent's relation to its children, e.g. `comments`
    pub related_name: String,
    /// Current parent id, `None` when the key is null
    pub parent_id: Option<String>,
}

impl ForeignKey {
    pub fn new(
        attname: impl Into<String>,
        parent_table: impl Into<String>,
        related_name: impl Into<String>,
        parent_id: Option<impl ToString>,
    ) -> Self {
        Self {
            attname: attname.into(),
            parent_table: parent_table.into(),
            related_name: related_name.into(),
            parent_id: parent_id.map(|id| id.to_string()),
        }
    }
}

/// Foreign-key values as they were when the entity was loaded.
///
/// Captured by the data layer at load time and handed to the mutation
/// observer together with the mutated entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    values: HashMap<String, Option<String>>,
}

impl ForeignKeySnapshot {
    /// Record the current foreign-key values of `entity`
    pub fn capture(entity: &dyn Entity) -> Self {
        let values = entity
            .foreign_keys()
            .into_iter()
            .map(|fk| (fk.attname, fk.parent_id))
            .collect();
        Self { values }
    }

    /// Build a snapshot from explicit attribute values
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Prior parent id for `attname`, if one was recorded and non-null
    pub fn prior(&self, attname: &str) -> Option<&str> {
        self.values.get(attname).and_then(|v| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Comment {
        id: u64,
        post_id: Option<u64>,
    }

    impl Entity for Comment {
        fn table(&self) -> &str {
            "comment"
        }

        fn id(&self) -> String {
            self.id.to_string()
        }

        fn foreign_keys(&self) -> Vec<ForeignKey> {
            vec![ForeignKey::new("post_id", "post", "comments", self.post_id)]
        }
    }

    #[test]
    fn test_capture_snapshot() {
        let mut comment = Comment {
            id: 1,
            post_id: Some(2),
        };
        let snapshot = ForeignKeySnapshot::capture(&comment);
        comment.post_id = Some(1);

        assert_eq!(snapshot.prior("post_id"), Some("2"));
        assert_eq!(snapshot.prior("author_id"), None);
        assert_eq!(comment.foreign_keys()[0].parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_null_foreign_key() {
        let comment = Comment { id: 3, post_id: None };
        let snapshot = ForeignKeySnapshot::capture(&comment);
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.prior("post_id"), None);
    }

    #[test]
    fn test_from_values() {
        let snapshot = ForeignKeySnapshot::from_values([("post_id", Some("5".to_string()))]);
        assert_eq!(snapshot.prior("post_id"), Some("5"));
    }
}
