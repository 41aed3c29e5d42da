//! Rename Minister and Rename Department.
//!
//! Identity is immutable, so a rename creates a successor entity, moves the
//! live edges over and links the two with a permanent `RENAMED_TO` edge.

use orgchart_core::command::Rename;
use orgchart_core::types::{DEPARTMENT, GOVERNMENT_ID, MINISTER};
use orgchart_core::{EntityId, EntityRecord, Kind, KindMajor, RelType, SearchCriteria};
use orgchart_graph::EntityStore;

use crate::error::{EngineError, Result, StoreResultExt};
use crate::{lookup, TransactionEngine};

impl<S: EntityStore> TransactionEngine<S> {
    /// Replace a minister by a successor under the government, carrying over
    /// every active department.
    pub async fn rename_minister(&mut self, cmd: &Rename) -> Result<u32> {
        let old_minister = lookup::find_one(
            &self.store,
            "old minister",
            &lookup::organisation(MINISTER, &cmd.old),
        )
        .await?;
        let government = self.government().await?;
        let at = cmd.date.timestamp();

        let new_minister = self
            .create_under(
                &government.id,
                &cmd.transaction_id,
                Kind::organisation(MINISTER),
                MINISTER,
                &cmd.new,
                RelType::AsMinister,
                at,
            )
            .await?;

        let departments: Vec<EntityId> = lookup::active_relationships(&self.store, &old_minister.id)
            .await?
            .into_iter()
            .filter(|rel| rel.name == RelType::AsDepartment)
            .map(|rel| rel.related_entity_id)
            .collect();

        for department in &departments {
            self.attach(&new_minister.id, department, RelType::AsDepartment, at)
                .await?;
            self.close_active(&old_minister.id, department, RelType::AsDepartment, at)
                .await?;
        }

        self.retire_minister(&government.id, &old_minister, at).await?;
        self.attach(&old_minister.id, &new_minister.id, RelType::RenamedTo, at)
            .await?;

        tracing::info!(
            old = %old_minister.name,
            new = %cmd.new,
            id = %new_minister.id,
            departments = departments.len(),
            "Minister renamed"
        );
        Ok(new_minister.counter)
    }

    /// Replace a department by a successor under the minister that currently
    /// holds it.
    pub async fn rename_department(&mut self, cmd: &Rename) -> Result<u32> {
        let old_department = lookup::find_one(
            &self.store,
            "old department",
            &lookup::organisation(DEPARTMENT, &cmd.old),
        )
        .await?;
        let minister = self.holding_minister(&old_department).await?;
        let at = cmd.date.timestamp();

        let new_department = self
            .create_under(
                &minister.id,
                &cmd.transaction_id,
                Kind::organisation(DEPARTMENT),
                DEPARTMENT,
                &cmd.new,
                RelType::AsDepartment,
                at,
            )
            .await?;
        self.close_active(&minister.id, &old_department.id, RelType::AsDepartment, at)
            .await?;
        self.attach(&old_department.id, &new_department.id, RelType::RenamedTo, at)
            .await?;

        tracing::info!(
            old = %old_department.name,
            new = %cmd.new,
            id = %new_department.id,
            minister = %minister.name,
            "Department renamed"
        );
        Ok(new_department.counter)
    }

    pub(crate) async fn government(&self) -> Result<EntityRecord> {
        lookup::find_one(
            &self.store,
            "government",
            &SearchCriteria::by_id(&EntityId::from(GOVERNMENT_ID)),
        )
        .await
    }

    /// The minister with an active `AS_DEPARTMENT` edge to `department`.
    ///
    /// A department does not record its parent, so every minister is scanned.
    async fn holding_minister(&self, department: &EntityRecord) -> Result<EntityRecord> {
        let ministers = self
            .store
            .search_entities(&SearchCriteria::kind(KindMajor::Organisation, Some(MINISTER)))
            .await
            .context("failed to search for ministers")?;

        for minister in ministers {
            let holds = lookup::all_relationships(&self.store, &minister.id)
                .await?
                .iter()
                .any(|rel| {
                    rel.name == RelType::AsDepartment
                        && rel.related_entity_id == department.id
                        && rel.is_active()
                });
            if holds {
                return Ok(minister);
            }
        }

        Err(EngineError::NoActiveMinister {
            department: department.name.clone(),
        })
    }
}
