//! Dependency-driven invalidation
//!
//! A mutation of an entity is expanded into its descriptor closure: every
//! descriptor whose dependency set may list entries derived from the mutated
//! data. The closure is then swept atomically: all members of those sets are
//! deleted together with the sets themselves.

use crate::cache::keys::KeyCoder;
use crate::cache::store::{DependencyStore, ScriptId};
use crate::cache::types::CacheKey;
use crate::error::Result;
use crate::schema::{DependencyDescriptor, Entity, ForeignKeySnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Reason for an invalidation sweep
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// An entity was inserted
    Created,

    /// An entity was updated
    Updated,

    /// An entity was deleted
    Deleted,

    /// A query-wide create/update/delete on a table
    BulkMutation { table: String },

    /// A many-to-many association changed
    AssociationChanged { table: String },

    /// Descriptors invalidated directly by the caller
    Manual,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Created => write!(f, "entity created"),
            InvalidationReason::Updated => write!(f, "entity updated"),
            InvalidationReason::Deleted => write!(f, "entity deleted"),
            InvalidationReason::BulkMutation { table } => write!(f, "bulk mutation of {}", table),
            InvalidationReason::AssociationChanged { table } => {
                write!(f, "association with {} changed", table)
            }
            InvalidationReason::Manual => write!(f, "manual invalidation"),
        }
    }
}

/// Change applied to a many-to-many association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationAction {
    /// Related ids were linked to the owner
    Add(Vec<String>),
    /// Related ids were unlinked from the owner
    Remove(Vec<String>),
    /// Every related row was unlinked
    Clear,
}

/// The descriptors implied by one mutation, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorClosure {
    descriptors: Vec<DependencyDescriptor>,
}

impl DescriptorClosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure of a created, updated or deleted instance.
    ///
    /// Includes the instance, its type, and the parent relation behind each
    /// foreign key. When `snapshot` shows the entity was re-parented, the
    /// previous parent's relation is included as well.
    pub fn for_instance(entity: &dyn Entity, snapshot: Option<&ForeignKeySnapshot>) -> Self {
        let mut closure = Self::new();
        closure.push(DependencyDescriptor::of(entity));
        closure.push(DependencyDescriptor::type_of(entity));
        closure.extend(Self::ancestor_relations(entity, snapshot));
        closure
    }

    /// Closure of a table-wide mutation: only the type itself
    pub fn for_bulk(table: &str) -> Self {
        let mut closure = Self::new();
        closure.push(DependencyDescriptor::of_type(table));
        closure
    }

    /// Closure of an association change between `owner` and rows of `related_table`
    pub fn for_association(
        owner: &dyn Entity,
        related_table: &str,
        action: &AssociationAction,
    ) -> Self {
        let mut closure = Self::for_instance(owner, None);
        match action {
            AssociationAction::Add(ids) | AssociationAction::Remove(ids) => {
                for id in ids {
                    closure.push(DependencyDescriptor::instance(related_table, id));
                }
                if !ids.is_empty() {
                    closure.push(DependencyDescriptor::of_type(related_table));
                }
            }
            AssociationAction::Clear => {
                closure.push(DependencyDescriptor::of_type(related_table));
            }
        }
        closure
    }

    /// Parent relations reachable through the entity's foreign keys
    pub fn ancestor_relations(
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Vec<DependencyDescriptor> {
        let mut relations = Vec::new();
        for fk in entity.foreign_keys() {
            let current = fk.parent_id.as_deref();
            if let Some(parent_id) = current {
                relations.push(DependencyDescriptor::relation(
                    &fk.parent_table,
                    parent_id,
                    &fk.related_name,
                ));
            }

            let prior = snapshot.and_then(|s| s.prior(&fk.attname));
            if let Some(prior_id) = prior {
                if Some(prior_id) != current {
                    relations.push(DependencyDescriptor::relation(
                        &fk.parent_table,
                        prior_id,
                        &fk.related_name,
                    ));
                }
            }
        }
        relations
    }

    pub fn push(&mut self, descriptor: DependencyDescriptor) {
        if !self.descriptors.contains(&descriptor) {
            self.descriptors.push(descriptor);
        }
    }

    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = DependencyDescriptor>) {
        for descriptor in descriptors {
            self.push(descriptor);
        }
    }

    pub fn descriptors(&self) -> &[DependencyDescriptor] {
        &self.descriptors
    }

    pub fn contains(&self, descriptor: &DependencyDescriptor) -> bool {
        self.descriptors.contains(descriptor)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Record of one invalidation sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationReport {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the sweep completed
    pub timestamp: DateTime<Utc>,

    /// Dependency sets that were swept
    pub dependency_keys: Vec<String>,

    /// Entry keys that were deleted
    pub victims: Vec<CacheKey>,
}

impl InvalidationReport {
    pub fn new(reason: InvalidationReason, dependency_keys: Vec<String>, victims: Vec<CacheKey>) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            dependency_keys,
            victims,
        }
    }

    pub fn victim_count(&self) -> usize {
        self.victims.len()
    }
}

/// Deletes entries whose dependencies changed
#[derive(Clone)]
pub struct Invalidator {
    store: Arc<dyn DependencyStore>,
    coder: KeyCoder,
}

impl Invalidator {
    pub fn new(store: Arc<dyn DependencyStore>, coder: KeyCoder) -> Self {
        Self { store, coder }
    }

    /// Atomically delete every entry depending on any of `descriptors`,
    /// together with the dependency sets, and return the deleted entry keys.
    ///
    /// An empty descriptor list is a no-op.
    pub async fn invalidate_dependents(
        &self,
        descriptors: &[DependencyDescriptor],
    ) -> Result<Vec<CacheKey>> {
        let report = self.sweep(InvalidationReason::Manual, descriptors).await?;
        Ok(report.victims)
    }

    /// Sweep a mutation's closure and describe what was removed
    pub async fn invalidate_closure(
        &self,
        reason: InvalidationReason,
        closure: &DescriptorClosure,
    ) -> Result<InvalidationReport> {
        self.sweep(reason, closure.descriptors()).await
    }

    async fn sweep(
        &self,
        reason: InvalidationReason,
        descriptors: &[DependencyDescriptor],
    ) -> Result<InvalidationReport> {
        let dependency_keys = self.coder.dependency_keys(descriptors)?;
        if dependency_keys.is_empty() {
            return Ok(InvalidationReport::new(reason, dependency_keys, Vec::new()));
        }

        let victims = self
            .store
            .run_atomic(ScriptId::InvalidateDependents, &dependency_keys, &[])
            .await?;

        debug!(
            reason = %reason,
            dependents_keys = ?dependency_keys,
            deleted_keys = ?victims,
            "cache_invalidation"
        );

        Ok(InvalidationReport::new(reason, dependency_keys, victims))
    }
}
