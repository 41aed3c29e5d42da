//! Terminate Entity: close the active edge between a parent and a child.

use chrono::{DateTime, Utc};

use orgchart_core::command::TerminateEntity;
use orgchart_core::types::MINISTER;
use orgchart_core::{
    EntityRecord, EntityId, KindMajor, RelType, Relationship, RelationshipFilter, RelationshipId,
    SearchCriteria,
};
use orgchart_graph::EntityStore;

use crate::error::{EngineError, Result};
use crate::{lookup, TransactionEngine};

impl<S: EntityStore> TransactionEngine<S> {
    /// Close the active edge from a parent organisation to a child
    /// organisation. A minister with active departments cannot be closed.
    pub async fn terminate_organisation(&mut self, cmd: &TerminateEntity) -> Result<()> {
        let parent = lookup::find_one(
            &self.store,
            "parent entity",
            &lookup::organisation(&cmd.parent_type, &cmd.parent),
        )
        .await?;
        let child = lookup::find_one(
            &self.store,
            "child entity",
            &lookup::organisation(&cmd.child_type, &cmd.child),
        )
        .await?;

        if cmd.child_type == MINISTER {
            self.ensure_no_active_departments(&child).await?;
        }

        self.close_active(&parent.id, &child.id, cmd.rel_type, cmd.date.timestamp())
            .await?;
        tracing::info!(parent = %parent.name, child = %child.name, rel_type = %cmd.rel_type, "Organisation terminated");
        Ok(())
    }

    /// Close the active edge from a parent organisation to a person.
    pub async fn terminate_person(&mut self, cmd: &TerminateEntity) -> Result<()> {
        let parent = lookup::find_one(
            &self.store,
            "parent entity",
            &lookup::organisation(&cmd.parent_type, &cmd.parent),
        )
        .await?;
        let child = lookup::find_one(
            &self.store,
            "child entity",
            &SearchCriteria::kind(KindMajor::Person, Some(cmd.child_type.as_str())).named(&cmd.child),
        )
        .await?;

        self.close_active(&parent.id, &child.id, cmd.rel_type, cmd.date.timestamp())
            .await?;
        tracing::info!(parent = %parent.name, child = %child.name, rel_type = %cmd.rel_type, "Person terminated");
        Ok(())
    }

    pub(crate) async fn ensure_no_active_departments(&self, minister: &EntityRecord) -> Result<()> {
        let active = lookup::all_relationships(&self.store, &minister.id)
            .await?
            .iter()
            .filter(|rel| rel.name == RelType::AsDepartment && rel.is_active())
            .count();

        if active > 0 {
            return Err(EngineError::BlockedByActiveDependents {
                minister: minister.name.clone(),
                active,
            });
        }
        Ok(())
    }

    /// Close a minister's `AS_MINISTER` edge from `government`, once all its
    /// departments are gone.
    pub(crate) async fn retire_minister(
        &mut self,
        government: &EntityId,
        minister: &EntityRecord,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_no_active_departments(minister).await?;
        self.close_active(government, &minister.id, RelType::AsMinister, at)
            .await?;
        Ok(())
    }

    /// Find the `rel_type` edge from `parent` to `child` in effect at `at` and
    /// close it at `at`.
    pub(crate) async fn close_active(
        &mut self,
        parent: &EntityId,
        child: &EntityId,
        rel_type: RelType,
        at: DateTime<Utc>,
    ) -> Result<RelationshipId> {
        let filter = RelationshipFilter {
            related_entity_id: Some(child.clone()),
            name: Some(rel_type),
            active_at: Some(at),
        };
        let candidates: Vec<Relationship> = lookup::related(&self.store, parent, &filter)
            .await?
            .into_iter()
            .filter(|rel| &rel.related_entity_id == child && rel.is_active())
            .collect();

        let chosen = select_active(candidates).ok_or_else(|| EngineError::NoActiveRelationship {
            parent: parent.to_string(),
            child: child.to_string(),
            rel_type: rel_type.to_string(),
        })?;

        self.detach(parent, &chosen.id, at).await?;
        Ok(chosen.id)
    }
}

/// Pick one edge among active candidates: the latest start time wins, ties
/// go to the greatest relationship id.
pub fn select_active(candidates: Vec<Relationship>) -> Option<Relationship> {
    if candidates.len() > 1 {
        tracing::warn!(
            candidates = candidates.len(),
            ids = ?candidates.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            "Several active relationships match; closing the most recent"
        );
    }
    candidates.into_iter().max_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    })
}
