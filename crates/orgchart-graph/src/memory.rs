//! In-process entity store.
//!
//! Same observable contract as the Neo4j backend: strict create, keyed
//! relationship upserts, patches validated before they are applied. Used by
//! the engine's tests and by dry runs of the apply tool.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use orgchart_core::{
    Entity, EntityId, EntityPatch, EntityRecord, Relationship, RelationshipFilter,
    RelationshipUpdate, SearchCriteria,
};

use crate::client::GraphError;
use crate::store::EntityStore;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entities: Mutex<BTreeMap<EntityId, Entity>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored entity, relationships included.
    pub async fn entity(&self, id: &str) -> Option<Entity> {
        self.entities.lock().await.get(&EntityId::from(id)).cloned()
    }

    /// Snapshot of a single relationship entry owned by `source`.
    pub async fn relationship(&self, source: &str, rel_id: &str) -> Option<Relationship> {
        let entities = self.entities.lock().await;
        entities
            .get(&EntityId::from(source))?
            .relationships
            .values()
            .find(|r| r.id.as_str() == rel_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entities.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.lock().await.is_empty()
    }

    /// Ids of every stored entity, in order.
    pub async fn ids(&self) -> Vec<EntityId> {
        self.entities.lock().await.keys().cloned().collect()
    }
}

impl EntityStore for InMemoryStore {
    async fn create_entity(&self, entity: &Entity) -> Result<EntityRecord, GraphError> {
        let mut entities = self.entities.lock().await;
        if entities.contains_key(&entity.id) {
            return Err(GraphError::AlreadyExists {
                id: entity.id.0.clone(),
            });
        }
        entities.insert(entity.id.clone(), entity.clone());
        Ok(entity.record())
    }

    async fn update_entity(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<EntityRecord, GraphError> {
        let mut entities = self.entities.lock().await;

        for update in &patch.relationships {
            match update {
                RelationshipUpdate::Upsert(rel) => {
                    if !entities.contains_key(&rel.related_entity_id) {
                        return Err(GraphError::NotFound {
                            id: rel.related_entity_id.0.clone(),
                        });
                    }
                }
                RelationshipUpdate::Close { id: rel_id, .. } => {
                    let owner = entities
                        .get(id)
                        .ok_or_else(|| GraphError::NotFound { id: id.0.clone() })?;
                    match owner.relationships.get(rel_id) {
                        None => {
                            return Err(GraphError::RelationshipNotFound {
                                entity_id: id.0.clone(),
                                relationship_id: rel_id.0.clone(),
                            })
                        }
                        Some(rel) if !rel.is_active() => {
                            return Err(GraphError::RelationshipClosed {
                                entity_id: id.0.clone(),
                                relationship_id: rel_id.0.clone(),
                            })
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        let entity = entities
            .get_mut(id)
            .ok_or_else(|| GraphError::NotFound { id: id.0.clone() })?;
        for update in &patch.relationships {
            match update {
                RelationshipUpdate::Upsert(rel) => {
                    entity.relationships.insert(rel.id.clone(), rel.clone());
                }
                RelationshipUpdate::Close {
                    id: rel_id,
                    end_time,
                } => {
                    if let Some(rel) = entity.relationships.get_mut(rel_id) {
                        rel.end_time = Some(*end_time);
                    }
                }
            }
        }
        Ok(entity.record())
    }

    async fn search_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<EntityRecord>, GraphError> {
        let entities = self.entities.lock().await;
        Ok(entities
            .values()
            .map(Entity::record)
            .filter(|record| criteria.matches(record))
            .collect())
    }

    async fn get_related_entities(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>, GraphError> {
        let entities = self.entities.lock().await;
        let entity = entities
            .get(id)
            .ok_or_else(|| GraphError::NotFound { id: id.0.clone() })?;
        Ok(entity
            .relationships
            .values()
            .filter(|rel| filter.matches(rel))
            .cloned()
            .collect())
    }
}
