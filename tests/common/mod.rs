//! Shared fixtures for integration tests: a small blog schema

#![allow(dead_code)]

use clever_cache::{CacheConfig, CleverCache, Entity, ForeignKey};

pub struct User {
    pub id: u64,
}

impl Entity for User {
    fn table(&self) -> &str {
        "user"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

pub struct Tag {
    pub id: u64,
}

impl Entity for Tag {
    fn table(&self) -> &str {
        "tag"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

pub struct Post {
    pub id: u64,
    pub author_id: u64,
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

pub struct Comment {
    pub id: u64,
    pub post_id: Option<u64>,
    pub author_id: u64,
}

impl Entity for Comment {
    fn table(&self) -> &str {
        "comment"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("post_id", "post", "comments", self.post_id),
            ForeignKey::new("author_id", "user", "comments", Some(self.author_id)),
        ]
    }
}

/// Fresh cache over an in-memory store
pub fn memory_cache() -> CleverCache {
    CleverCache::in_memory(CacheConfig::default()).expect("default config is valid")
}
