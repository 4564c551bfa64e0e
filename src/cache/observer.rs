//! Mutation observer interface
//!
//! The data layer calls these hooks synchronously after each committed
//! mutation. Each hook expands the mutation into its descriptor closure and
//! sweeps it.

use crate::cache::invalidation::{
    AssociationAction, DescriptorClosure, InvalidationReason, InvalidationReport, Invalidator,
};
use crate::error::Result;
use crate::schema::{Entity, ForeignKeySnapshot};
use async_trait::async_trait;
use tracing::info;

/// Hooks invoked by the data layer after a committed mutation
#[async_trait]
pub trait MutationObserver: Send + Sync {
    /// An entity was inserted
    async fn on_create(&self, entity: &dyn Entity) -> Result<InvalidationReport>;

    /// An entity was updated; `snapshot` holds its foreign keys as loaded
    async fn on_update(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport>;

    /// An entity was deleted; `snapshot` holds its foreign keys as loaded
    async fn on_delete(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport>;

    /// A bulk create/update/delete touched `table`
    async fn on_bulk_mutate(&self, table: &str) -> Result<InvalidationReport>;

    /// Rows of `related_table` were linked to or unlinked from `owner`
    async fn on_association_change(
        &self,
        owner: &dyn Entity,
        related_table: &str,
        action: &AssociationAction,
    ) -> Result<InvalidationReport>;
}

#[async_trait]
impl MutationObserver for Invalidator {
    async fn on_create(&self, entity: &dyn Entity) -> Result<InvalidationReport> {
        let closure = DescriptorClosure::for_instance(entity, None);
        self.invalidate_closure(InvalidationReason::Created, &closure)
            .await
    }

    async fn on_update(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport> {
        let closure = DescriptorClosure::for_instance(entity, snapshot);
        self.invalidate_closure(InvalidationReason::Updated, &closure)
            .await
    }

    async fn on_delete(
        &self,
        entity: &dyn Entity,
        snapshot: Option<&ForeignKeySnapshot>,
    ) -> Result<InvalidationReport> {
        let closure = DescriptorClosure::for_instance(entity, snapshot);
        self.invalidate_closure(InvalidationReason::Deleted, &closure)
            .await
    }

    async fn on_bulk_mutate(&self, table: &str) -> Result<InvalidationReport> {
        let closure = DescriptorClosure::for_bulk(table);
        let report = self
            .invalidate_closure(
                InvalidationReason::BulkMutation {
                    table: table.to_string(),
                },
                &closure,
            )
            .await?;
        info!(
            "Bulk mutation of {} invalidated {} entries",
            table,
            report.victim_count()
        );
        Ok(report)
    }

    async fn on_association_change(
        &self,
        owner: &dyn Entity,
        related_table: &str,
        action: &AssociationAction,
    ) -> Result<InvalidationReport> {
        let closure = DescriptorClosure::for_association(owner, related_table, action);
        self.invalidate_closure(
            InvalidationReason::AssociationChanged {
                table: related_table.to_string(),
            },
            &closure,
        )
        .await
    }
}
