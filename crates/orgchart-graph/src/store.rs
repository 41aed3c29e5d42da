//! The entity store boundary consumed by the transaction engine.

use std::future::Future;
use std::time::Duration;

use orgchart_core::{
    Entity, EntityId, EntityPatch, EntityRecord, Relationship, RelationshipFilter, SearchCriteria,
};

use crate::client::{GraphClient, GraphError};

/// Entity CRUD and relationship search over the organisation graph.
///
/// Every call is a single round trip; there is no transaction spanning
/// calls. Implementations must reject duplicate ids on create and must
/// apply a patch to the named relationship entries only.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    /// Create an entity. Fails with [`GraphError::AlreadyExists`] if the id is taken.
    async fn create_entity(&self, entity: &Entity) -> Result<EntityRecord, GraphError>;

    /// Merge a partial update into an existing entity.
    async fn update_entity(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<EntityRecord, GraphError>;

    /// Find entities matching all supplied criteria.
    async fn search_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<EntityRecord>, GraphError>;

    /// Relationships owned by `id` that match the filter.
    async fn get_related_entities(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>, GraphError>;

    /// Full relationship history (active and closed) owned by `id`.
    async fn get_all_related_entities(
        &self,
        id: &EntityId,
    ) -> Result<Vec<Relationship>, GraphError> {
        self.get_related_entities(id, &RelationshipFilter::default())
            .await
    }
}

impl EntityStore for GraphClient {
    async fn create_entity(&self, entity: &Entity) -> Result<EntityRecord, GraphError> {
        self.create_entity_node(entity).await
    }

    async fn update_entity(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<EntityRecord, GraphError> {
        self.apply_patch(id, patch).await
    }

    async fn search_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<EntityRecord>, GraphError> {
        self.find_entities(criteria).await
    }

    async fn get_related_entities(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>, GraphError> {
        self.outgoing_relationships(id, filter).await
    }
}

/// Bounds every call of the wrapped store with a deadline.
///
/// A timed-out call surfaces as [`GraphError::Timeout`]. The write it was
/// waiting on may or may not have been applied.
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GraphError>>,
    ) -> Result<T, GraphError> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout {
                millis: self.limit.as_millis() as u64,
            }),
        }
    }
}

impl<S: EntityStore> EntityStore for TimeoutStore<S> {
    async fn create_entity(&self, entity: &Entity) -> Result<EntityRecord, GraphError> {
        self.bounded(self.inner.create_entity(entity)).await
    }

    async fn update_entity(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<EntityRecord, GraphError> {
        self.bounded(self.inner.update_entity(id, patch)).await
    }

    async fn search_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<EntityRecord>, GraphError> {
        self.bounded(self.inner.search_entities(criteria)).await
    }

    async fn get_related_entities(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>, GraphError> {
        self.bounded(self.inner.get_related_entities(id, filter))
            .await
    }

    async fn get_all_related_entities(
        &self,
        id: &EntityId,
    ) -> Result<Vec<Relationship>, GraphError> {
        self.bounded(self.inner.get_all_related_entities(id)).await
    }
}
