//! Add Entity: create (or reuse) a child and attach it to its parent.

use chrono::{DateTime, Utc};

use orgchart_core::command::{AddDocument, AddEntity};
use orgchart_core::types::DOCUMENT_COUNTER;
use orgchart_core::{
    Allocation, EntityId, Kind, KindMajor, RelType, SearchCriteria, TransactionId,
};
use orgchart_graph::EntityStore;

use crate::error::Result;
use crate::{lookup, TransactionEngine};

impl<S: EntityStore> TransactionEngine<S> {
    /// Create a new organisation and attach it to its parent.
    ///
    /// Organisations are never deduplicated by name: a rename cycle can leave
    /// distinct historical instances sharing one.
    pub async fn add_organisation(&mut self, cmd: &AddEntity) -> Result<u32> {
        let parent = lookup::find_one(
            &self.store,
            "parent entity",
            &lookup::organisation(&cmd.parent_type, &cmd.parent),
        )
        .await?;

        let child = self
            .create_under(
                &parent.id,
                &cmd.transaction_id,
                Kind::organisation(&cmd.child_type),
                &cmd.child_type,
                &cmd.child,
                cmd.rel_type,
                cmd.date.timestamp(),
            )
            .await?;
        Ok(child.counter)
    }

    /// Attach a person to an organisation, creating the person only if no
    /// person of any minor kind already has that name.
    pub async fn add_person(&mut self, cmd: &AddEntity) -> Result<u32> {
        let parent = lookup::find_one(
            &self.store,
            "parent entity",
            &lookup::organisation(&cmd.parent_type, &cmd.parent),
        )
        .await?;

        let existing = lookup::find_existing(
            &self.store,
            "person entity",
            &SearchCriteria::kind(KindMajor::Person, None).named(&cmd.child),
        )
        .await?;

        self.attach_or_create(
            &parent.id,
            existing.map(|record| record.id),
            &cmd.transaction_id,
            Kind::person(&cmd.child_type),
            &cmd.child_type,
            &cmd.child,
            cmd.rel_type,
            cmd.date.timestamp(),
        )
        .await
    }

    /// Attach a document to an organisation with `AS_DOCUMENT`, creating the
    /// document only if none of the same minor kind has that name.
    pub async fn add_document(&mut self, cmd: &AddDocument) -> Result<u32> {
        let parent = lookup::find_one(
            &self.store,
            "parent entity",
            &lookup::organisation(&cmd.parent_type, &cmd.parent),
        )
        .await?;

        let existing = lookup::find_existing(
            &self.store,
            "document entity",
            &SearchCriteria::kind(KindMajor::Document, Some(cmd.child_type.as_str())).named(&cmd.child),
        )
        .await?;

        self.attach_or_create(
            &parent.id,
            existing.map(|record| record.id),
            &cmd.transaction_id,
            Kind::document(&cmd.child_type),
            DOCUMENT_COUNTER,
            &cmd.child,
            RelType::AsDocument,
            cmd.date.timestamp(),
        )
        .await
    }

    /// Create a child entity and attach it under `parent`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn create_under(
        &mut self,
        parent: &EntityId,
        transaction_id: &TransactionId,
        kind: Kind,
        counter_label: &str,
        name: &str,
        rel_type: RelType,
        at: DateTime<Utc>,
    ) -> Result<Allocation> {
        let child = self
            .create_entity(transaction_id, kind, counter_label, name, at)
            .await?;
        self.attach(parent, &child.id, rel_type, at).await?;
        Ok(child)
    }

    #[allow(clippy::too_many_arguments)]
    async fn attach_or_create(
        &mut self,
        parent: &EntityId,
        existing: Option<EntityId>,
        transaction_id: &TransactionId,
        kind: Kind,
        counter_label: &str,
        name: &str,
        rel_type: RelType,
        at: DateTime<Utc>,
    ) -> Result<u32> {
        match existing {
            Some(child) => {
                tracing::info!(id = %child, name, "Reusing existing entity");
                self.attach(parent, &child, rel_type, at).await?;
                Ok(0)
            }
            None => {
                let child = self
                    .create_under(parent, transaction_id, kind, counter_label, name, rel_type, at)
                    .await?;
                Ok(child.counter)
            }
        }
    }
}
