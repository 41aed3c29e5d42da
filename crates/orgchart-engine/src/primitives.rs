//! Relationship primitives: the only store writes the operations issue.
//!
//! `attach` and `detach` do not check for conflicting edges. Keeping at most
//! one active edge per pair is up to the composite operations, which detach
//! the old edge while attaching the new one.

use chrono::{DateTime, Utc};

use orgchart_core::{
    Allocation, AppliedStep, Entity, EntityId, EntityPatch, Kind, RelType, Relationship,
    RelationshipId, TransactionId,
};
use orgchart_graph::EntityStore;

use crate::error::{Result, StoreResultExt};
use crate::TransactionEngine;

impl<S: EntityStore> TransactionEngine<S> {
    /// Write a new active `rel_type` edge from `source` to `target`.
    ///
    /// The edge is keyed by the endpoint pair, so an existing entry for the
    /// same pair is overwritten.
    pub async fn attach(
        &mut self,
        source: &EntityId,
        target: &EntityId,
        rel_type: RelType,
        start_time: DateTime<Utc>,
    ) -> Result<RelationshipId> {
        let relationship = Relationship::new(source, target, rel_type, start_time);
        let relationship_id = relationship.id.clone();

        self.store
            .update_entity(source, &EntityPatch::attach(relationship))
            .await
            .with_context(|| format!("failed to attach {rel_type} {source} -> {target}"))?;

        tracing::debug!(%source, %target, %rel_type, %relationship_id, "Attached");
        self.steps.push(AppliedStep::Attach {
            source_id: source.clone(),
            relationship_id: relationship_id.clone(),
            target_id: target.clone(),
            rel_type,
            start_time,
        });
        Ok(relationship_id)
    }

    /// Set the end time of an edge owned by `source`.
    pub async fn detach(
        &mut self,
        source: &EntityId,
        relationship_id: &RelationshipId,
        end_time: DateTime<Utc>,
    ) -> Result<()> {
        self.store
            .update_entity(source, &EntityPatch::close(relationship_id.clone(), end_time))
            .await
            .with_context(|| format!("failed to terminate relationship {relationship_id}"))?;

        tracing::debug!(%source, %relationship_id, "Detached");
        self.steps.push(AppliedStep::Detach {
            source_id: source.clone(),
            relationship_id: relationship_id.clone(),
            end_time,
        });
        Ok(())
    }

    /// Allocate an id for a new entity and create it.
    ///
    /// The counter is committed only once the store accepted the entity, so a
    /// rejected create (e.g. a replayed transaction) leaves the context as it was.
    pub(crate) async fn create_entity(
        &mut self,
        transaction_id: &TransactionId,
        kind: Kind,
        counter_label: &str,
        name: &str,
        created: DateTime<Utc>,
    ) -> Result<Allocation> {
        let allocation = self.counters.allocate(transaction_id, counter_label)?;
        let entity = Entity::new(allocation.id.clone(), kind, name, created);

        self.store
            .create_entity(&entity)
            .await
            .with_context(|| format!("failed to create child entity {}", allocation.id))?;
        self.counters.commit(&allocation);

        tracing::info!(id = %allocation.id, kind = %entity.kind, name, "Entity created");
        self.steps.push(AppliedStep::CreateEntity {
            entity_id: entity.id,
            kind: entity.kind,
            name: name.to_string(),
        });
        Ok(allocation)
    }
}
