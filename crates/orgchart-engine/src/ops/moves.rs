//! Move Department and Move Person: re-parent a child between ministers.

use chrono::{DateTime, Utc};

use orgchart_core::command::MoveChild;
use orgchart_core::types::{CITIZEN, DEPARTMENT, MINISTER};
use orgchart_core::{EntityId, EntityRecord, KindMajor, RelType, SearchCriteria, ValidationError};
use orgchart_graph::EntityStore;

use crate::error::Result;
use crate::{lookup, TransactionEngine};

impl<S: EntityStore> TransactionEngine<S> {
    /// Attach a department to its new minister and close its edge to the old
    /// one. A department already detached from the old minister still moves.
    pub async fn move_department(&mut self, cmd: &MoveChild) -> Result<()> {
        let (old_minister, new_minister) = self.resolve_ministers(cmd).await?;
        let department = lookup::find_one(
            &self.store,
            "department",
            &lookup::organisation(DEPARTMENT, &cmd.child),
        )
        .await?;

        self.move_department_by_id(
            &old_minister.id,
            &new_minister.id,
            &department.id,
            cmd.date.timestamp(),
        )
        .await?;
        tracing::info!(
            department = %department.name,
            from = %old_minister.name,
            to = %new_minister.name,
            "Department moved"
        );
        Ok(())
    }

    /// Attach a citizen to the new minister and close the appointment to the
    /// old one. Unlike a department move, a missing old appointment fails.
    pub async fn move_person(&mut self, cmd: &MoveChild) -> Result<()> {
        let (old_minister, new_minister) = self.resolve_ministers(cmd).await?;
        let person = lookup::find_one(
            &self.store,
            "person",
            &SearchCriteria::kind(KindMajor::Person, Some(CITIZEN)).named(&cmd.child),
        )
        .await?;

        let at = cmd.date.timestamp();
        self.attach(&new_minister.id, &person.id, RelType::AsAppointed, at)
            .await?;
        self.close_active(&old_minister.id, &person.id, RelType::AsAppointed, at)
            .await?;
        tracing::info!(
            person = %person.name,
            from = %old_minister.name,
            to = %new_minister.name,
            "Person moved"
        );
        Ok(())
    }

    pub(crate) async fn move_department_by_id(
        &mut self,
        old_minister: &EntityId,
        new_minister: &EntityId,
        department: &EntityId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.attach(new_minister, department, RelType::AsDepartment, at)
            .await?;

        let still_attached = lookup::active_relationships(&self.store, old_minister)
            .await?
            .iter()
            .any(|rel| &rel.related_entity_id == department && rel.name == RelType::AsDepartment);

        if still_attached {
            self.close_active(old_minister, department, RelType::AsDepartment, at)
                .await?;
        } else {
            tracing::debug!(%old_minister, %department, "No active edge to close on old minister");
        }
        Ok(())
    }

    /// Resolve old and new ministers, rejecting a move onto the same one.
    async fn resolve_ministers(&self, cmd: &MoveChild) -> Result<(EntityRecord, EntityRecord)> {
        let new_minister = lookup::find_one(
            &self.store,
            "new minister",
            &lookup::organisation(MINISTER, &cmd.new_parent),
        )
        .await?;
        let old_minister = lookup::find_one(
            &self.store,
            "old minister",
            &lookup::organisation(MINISTER, &cmd.old_parent),
        )
        .await?;

        if old_minister.id == new_minister.id {
            return Err(ValidationError::SameParent(cmd.old_parent.clone()).into());
        }
        Ok((old_minister, new_minister))
    }
}
