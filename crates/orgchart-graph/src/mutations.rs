//! Write operations against the Neo4j entity graph.
//!
//! Entity creation is strict (a taken id is an error, never a merge).
//! Closing an edge that is already closed is an error; its end time stays.
//! Relationship upserts MERGE on the owning node and the relationship id,
//! so re-attaching the same endpoint pair overwrites the previous edge.

use chrono::{DateTime, Utc};
use neo4rs::query;

use orgchart_core::types::format_timestamp;
use orgchart_core::{Entity, EntityId, EntityPatch, EntityRecord, Relationship, RelationshipUpdate};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    /// Create an entity node. Fails with `AlreadyExists` if the id is taken.
    pub async fn create_entity_node(&self, entity: &Entity) -> Result<EntityRecord, GraphError> {
        // The major kind is a closed enum, so it is safe to splice as a label.
        let cypher = format!(
            "OPTIONAL MATCH (existing:Entity {{id: $id}})
             WITH existing WHERE existing IS NULL
             CREATE (n:Entity:{label} {{
               id: $id, kind_major: $kind_major, kind_minor: $kind_minor,
               name: $name, name_start: $name_start,
               created: $created, terminated: $terminated,
               metadata: $metadata, attributes: $attributes
             }})
             RETURN n.id AS id",
            label = entity.kind.major.as_str(),
        );
        let q = query(&cypher)
            .param("id", entity.id.0.clone())
            .param("kind_major", entity.kind.major.as_str().to_string())
            .param("kind_minor", entity.kind.minor.clone())
            .param("name", entity.name.value.clone())
            .param("name_start", format_timestamp(&entity.name.start_time))
            .param("created", format_timestamp(&entity.created))
            .param("terminated", opt_timestamp(&entity.terminated))
            .param("metadata", ser(&entity.metadata)?)
            .param("attributes", ser(&entity.attributes)?);

        if self.query_one(q).await?.is_none() {
            return Err(GraphError::AlreadyExists {
                id: entity.id.0.clone(),
            });
        }

        if !entity.relationships.is_empty() {
            let patch = EntityPatch {
                relationships: entity
                    .relationships
                    .values()
                    .cloned()
                    .map(RelationshipUpdate::Upsert)
                    .collect(),
            };
            self.apply_patch(&entity.id, &patch).await?;
        }

        tracing::debug!(id = %entity.id, kind = %entity.kind, "Created entity node");
        Ok(entity.record())
    }

    /// Apply a relationship patch to an existing entity in one transaction.
    ///
    /// Every target and every closed relationship is checked before any
    /// write, so a patch with a dangling reference changes nothing.
    pub async fn apply_patch(
        &self,
        id: &EntityId,
        patch: &EntityPatch,
    ) -> Result<EntityRecord, GraphError> {
        let record = self
            .get_entity_record(id)
            .await?
            .ok_or_else(|| GraphError::NotFound { id: id.0.clone() })?;

        for update in &patch.relationships {
            match update {
                RelationshipUpdate::Upsert(rel) => {
                    if !self.entity_exists(&rel.related_entity_id).await? {
                        return Err(GraphError::NotFound {
                            id: rel.related_entity_id.0.clone(),
                        });
                    }
                }
                RelationshipUpdate::Close { id: rel_id, .. } => {
                    match self.relationship_end_time(id, rel_id.as_str()).await? {
                        None => {
                            return Err(GraphError::RelationshipNotFound {
                                entity_id: id.0.clone(),
                                relationship_id: rel_id.0.clone(),
                            })
                        }
                        Some(end_time) if !end_time.is_empty() => {
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

        let mut txn = self.start_txn().await?;
        for update in &patch.relationships {
            match update {
                RelationshipUpdate::Upsert(rel) => {
                    // A key may be re-used with a different type; drop the old edge first.
                    txn.run(
                        query(
                            "MATCH (a:Entity {id: $source})-[old {id: $rel_id}]->()
                             WHERE type(old) <> $rel_type
                             DELETE old",
                        )
                        .param("source", id.0.clone())
                        .param("rel_id", rel.id.0.clone())
                        .param("rel_type", rel.name.as_str().to_string()),
                    )
                    .await?;
                    txn.run(upsert_edge_query(id, rel)).await?;
                }
                RelationshipUpdate::Close {
                    id: rel_id,
                    end_time,
                } => {
                    txn.run(
                        query(
                            "MATCH (a:Entity {id: $source})-[r {id: $rel_id}]->()
                             SET r.end_time = $end_time",
                        )
                        .param("source", id.0.clone())
                        .param("rel_id", rel_id.0.clone())
                        .param("end_time", format_timestamp(end_time)),
                    )
                    .await?;
                }
            }
        }
        txn.commit().await?;

        tracing::debug!(
            id = %id,
            updates = patch.relationships.len(),
            "Applied relationship patch"
        );
        Ok(record)
    }
}

fn upsert_edge_query(source: &EntityId, rel: &Relationship) -> neo4rs::Query {
    let cypher = format!(
        "MATCH (a:Entity {{id: $source}})
         MATCH (b:Entity {{id: $target}})
         MERGE (a)-[r:{rel_type} {{id: $rel_id}}]->(b)
         SET r.start_time = $start_time, r.end_time = $end_time",
        rel_type = rel.name.as_str(),
    );
    query(&cypher)
        .param("source", source.0.clone())
        .param("target", rel.related_entity_id.0.clone())
        .param("rel_id", rel.id.0.clone())
        .param("start_time", format_timestamp(&rel.start_time))
        .param("end_time", opt_timestamp(&rel.end_time))
}

/// Empty string stands for "no timestamp" (Neo4j has no null properties).
fn opt_timestamp(ts: &Option<DateTime<Utc>>) -> String {
    ts.as_ref().map(format_timestamp).unwrap_or_default()
}

fn ser<T: serde::Serialize>(val: &T) -> Result<String, GraphError> {
    serde_json::to_string(val).map_err(|e| GraphError::Serialization(e.to_string()))
}
