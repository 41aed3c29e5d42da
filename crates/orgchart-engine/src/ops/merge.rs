//! Merge Ministers: fold several ministers into a new one.

use orgchart_core::command::Merge;
use orgchart_core::types::MINISTER;
use orgchart_core::{EntityId, Kind, RelType};
use orgchart_graph::EntityStore;

use crate::error::Result;
use crate::{lookup, TransactionEngine};

impl<S: EntityStore> TransactionEngine<S> {
    /// Create the merged minister, then for each old minister in order: move
    /// its departments over, close its government edge and link it with
    /// `MERGED_INTO`.
    ///
    /// Old ministers merged before a failure stay merged; later ones are
    /// untouched.
    pub async fn merge_ministers(&mut self, cmd: &Merge) -> Result<u32> {
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

        for name in &cmd.old {
            let old_minister = lookup::find_one(
                &self.store,
                "old minister",
                &lookup::organisation(MINISTER, name),
            )
            .await?;

            let departments: Vec<EntityId> =
                lookup::active_relationships(&self.store, &old_minister.id)
                    .await?
                    .into_iter()
                    .filter(|rel| rel.name == RelType::AsDepartment)
                    .map(|rel| rel.related_entity_id)
                    .collect();

            for department in &departments {
                self.move_department_by_id(&old_minister.id, &new_minister.id, department, at)
                    .await?;
            }

            self.retire_minister(&government.id, &old_minister, at).await?;
            self.attach(&old_minister.id, &new_minister.id, RelType::MergedInto, at)
                .await?;
            tracing::info!(
                old = %old_minister.name,
                new = %cmd.new,
                departments = departments.len(),
                "Minister merged"
            );
        }

        Ok(new_minister.counter)
    }
}
