//! orgchart-engine: Temporal relationship transaction engine.
//!
//! Applies organisational-change commands (add, terminate, move, rename,
//! merge) to the entity graph as sequences of lookups and relationship
//! writes. Relationships are never deleted: superseded edges are closed by
//! setting their end time, so the graph keeps its full history.
//!
//! A [`TransactionEngine`] owns its allocation context and takes `&mut self`
//! for every mutating call, so one engine is one serialized writer. Composite
//! operations are not atomic: a failure partway through leaves the completed
//! writes in the store, and [`TransactionEngine::take_steps`] reports them.

pub mod error;
pub mod lookup;
pub mod ops;
pub mod primitives;

pub use error::{EngineError, Result, StoreResultExt};

use orgchart_core::types::{GOVERNMENT, GOVERNMENT_FOUNDED, GOVERNMENT_ID, GOVERNMENT_NAME};
use orgchart_core::{
    AppliedStep, Command, EffectiveDate, Entity, EntityCounters, EntityId, EntityRecord, Kind,
    SearchCriteria,
};
use orgchart_graph::EntityStore;

/// Applies transaction commands against an entity store.
pub struct TransactionEngine<S> {
    store: S,
    counters: EntityCounters,
    steps: Vec<AppliedStep>,
}

impl<S> TransactionEngine<S> {
    /// Create an engine over `store` with the batch's allocation context.
    pub fn new(store: S, counters: EntityCounters) -> Self {
        Self {
            store,
            counters,
            steps: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The allocation context as advanced so far.
    pub fn counters(&self) -> &EntityCounters {
        &self.counters
    }

    /// Store writes completed by the most recent command.
    pub fn steps(&self) -> &[AppliedStep] {
        &self.steps
    }

    /// Take the store writes completed by the most recent command, including
    /// those of a command that failed partway through.
    pub fn take_steps(&mut self) -> Vec<AppliedStep> {
        std::mem::take(&mut self.steps)
    }

    /// Finish the batch and hand back the advanced allocation context.
    pub fn into_counters(self) -> EntityCounters {
        self.counters
    }

    pub fn into_parts(self) -> (S, EntityCounters) {
        (self.store, self.counters)
    }
}

impl<S: EntityStore> TransactionEngine<S> {
    /// Apply one command.
    ///
    /// Returns the counter value allocated for the entity the command created,
    /// or 0 when it created none (terminations, moves, reused people and
    /// documents).
    pub async fn apply(&mut self, command: &Command) -> Result<u32> {
        self.steps.clear();
        let operation = command.operation();
        tracing::debug!(%operation, "Applying transaction");

        let counter = match command {
            Command::AddOrganisation(cmd) => self.add_organisation(cmd).await?,
            Command::AddPerson(cmd) => self.add_person(cmd).await?,
            Command::AddDocument(cmd) => self.add_document(cmd).await?,
            Command::TerminateOrganisation(cmd) => {
                self.terminate_organisation(cmd).await?;
                0
            }
            Command::TerminatePerson(cmd) => {
                self.terminate_person(cmd).await?;
                0
            }
            Command::MoveDepartment(cmd) => {
                self.move_department(cmd).await?;
                0
            }
            Command::MovePerson(cmd) => {
                self.move_person(cmd).await?;
                0
            }
            Command::RenameMinister(cmd) => self.rename_minister(cmd).await?,
            Command::RenameDepartment(cmd) => self.rename_department(cmd).await?,
            Command::MergeMinisters(cmd) => self.merge_ministers(cmd).await?,
        };

        tracing::info!(
            %operation,
            counter,
            steps = self.steps.len(),
            "Transaction applied"
        );
        Ok(counter)
    }

    /// Create the root government entity if it does not exist yet.
    pub async fn bootstrap_government(&mut self) -> Result<EntityRecord> {
        self.steps.clear();
        let id = EntityId::from(GOVERNMENT_ID);
        if let Some(existing) =
            lookup::find_existing(&self.store, "government", &SearchCriteria::by_id(&id)).await?
        {
            tracing::debug!(id = %existing.id, "Government already present");
            return Ok(existing);
        }

        let founded = EffectiveDate::parse(GOVERNMENT_FOUNDED)?.timestamp();
        let government = Entity::new(
            id,
            Kind::organisation(GOVERNMENT),
            GOVERNMENT_NAME,
            founded,
        );
        let record = self
            .store
            .create_entity(&government)
            .await
            .context("failed to create government entity")?;
        self.steps.push(AppliedStep::CreateEntity {
            entity_id: record.id.clone(),
            kind: record.kind.clone(),
            name: record.name.clone(),
        });

        tracing::info!(id = %record.id, name = %record.name, "Government created");
        Ok(record)
    }
}
