//! Read queries against the Neo4j entity graph.

use chrono::{DateTime, Utc};
use neo4rs::query;

use orgchart_core::types::{format_timestamp, parse_timestamp};
use orgchart_core::{
    EntityId, EntityRecord, Kind, KindMajor, RelType, Relationship, RelationshipFilter,
    RelationshipId, SearchCriteria,
};

use crate::client::{GraphClient, GraphError};

const RECORD_COLUMNS: &str = "n.id AS id, n.kind_major AS kind_major, n.kind_minor AS kind_minor,
     n.name AS name, n.created AS created, n.terminated AS terminated";

impl GraphClient {
    // ── Entity Lookups ───────────────────────────────────────────

    /// Get an entity record by id.
    pub async fn get_entity_record(
        &self,
        id: &EntityId,
    ) -> Result<Option<EntityRecord>, GraphError> {
        let cypher = format!("MATCH (n:Entity {{id: $id}}) RETURN {RECORD_COLUMNS}");
        match self.query_one(query(&cypher).param("id", id.0.clone())).await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn entity_exists(&self, id: &EntityId) -> Result<bool, GraphError> {
        let q = query("MATCH (n:Entity {id: $id}) RETURN count(n) AS cnt").param("id", id.0.clone());
        Ok(count(self.query_one(q).await?) > 0)
    }

    /// The stored end time of relationship `rel_id` owned by `source`:
    /// `None` if there is no such edge, `Some("")` while it is active.
    pub async fn relationship_end_time(
        &self,
        source: &EntityId,
        rel_id: &str,
    ) -> Result<Option<String>, GraphError> {
        let q = query(
            "MATCH (a:Entity {id: $source})-[r {id: $rel_id}]->()
             RETURN coalesce(r.end_time, '') AS end_time",
        )
        .param("source", source.0.clone())
        .param("rel_id", rel_id.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(Some(column(&row, "end_time")?)),
            None => Ok(None),
        }
    }

    /// Find entities matching every supplied criterion, ordered by id.
    pub async fn find_entities(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<EntityRecord>, GraphError> {
        let mut clauses = Vec::new();
        if let Some(kind) = &criteria.kind {
            clauses.push("n.kind_major = $kind_major");
            if kind.minor.is_some() {
                clauses.push("n.kind_minor = $kind_minor");
            }
        }
        if criteria.name.is_some() {
            clauses.push("n.name = $name");
        }
        if criteria.id.is_some() {
            clauses.push("n.id = $id");
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let cypher = format!("MATCH (n:Entity) {filter} RETURN {RECORD_COLUMNS} ORDER BY n.id");
        let mut q = query(&cypher);
        if let Some(kind) = &criteria.kind {
            q = q.param("kind_major", kind.major.as_str().to_string());
            if let Some(minor) = &kind.minor {
                q = q.param("kind_minor", minor.clone());
            }
        }
        if let Some(name) = &criteria.name {
            q = q.param("name", name.clone());
        }
        if let Some(id) = &criteria.id {
            q = q.param("id", id.0.clone());
        }

        let rows = self.query_rows(q).await?;
        let records = rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(criteria = %criteria, found = records.len(), "Entity search");
        Ok(records)
    }

    // ── Relationship Lookups ─────────────────────────────────────

    /// Relationships owned by `id` that match the filter, ordered by id.
    pub async fn outgoing_relationships(
        &self,
        id: &EntityId,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>, GraphError> {
        if !self.entity_exists(id).await? {
            return Err(GraphError::NotFound { id: id.0.clone() });
        }

        // Timestamps share one fixed-width UTC format, so string order is time order.
        let q = query(
            "MATCH (a:Entity {id: $id})-[r]->(b:Entity)
             WHERE ($target = '' OR b.id = $target)
               AND ($rel_type = '' OR type(r) = $rel_type)
               AND ($at = '' OR (r.start_time <= $at AND (r.end_time = '' OR r.end_time > $at)))
             RETURN r.id AS rel_id, type(r) AS rel_type, b.id AS target_id,
                    r.start_time AS start_time, r.end_time AS end_time
             ORDER BY r.id",
        )
        .param("id", id.0.clone())
        .param(
            "target",
            filter
                .related_entity_id
                .as_ref()
                .map(|t| t.0.clone())
                .unwrap_or_default(),
        )
        .param(
            "rel_type",
            filter.name.map(|n| n.as_str().to_string()).unwrap_or_default(),
        )
        .param(
            "at",
            filter.active_at.as_ref().map(format_timestamp).unwrap_or_default(),
        );

        self.query_rows(q)
            .await?
            .iter()
            .map(row_to_relationship)
            .collect()
    }
}

fn count(row: Option<neo4rs::Row>) -> i64 {
    row.and_then(|r| r.get::<i64>("cnt").ok()).unwrap_or(0)
}

fn column(row: &neo4rs::Row, name: &str) -> Result<String, GraphError> {
    row.get::<String>(name)
        .map_err(|e| GraphError::Serialization(format!("Failed to read column {name}: {e}")))
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>, GraphError> {
    parse_timestamp(raw)
        .map_err(|e| GraphError::Serialization(format!("Bad timestamp '{raw}': {e}")))
}

fn opt_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, GraphError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        timestamp(raw).map(Some)
    }
}

fn row_to_record(row: &neo4rs::Row) -> Result<EntityRecord, GraphError> {
    let major: KindMajor = column(row, "kind_major")?
        .parse()
        .map_err(|e| GraphError::Serialization(format!("{e}")))?;
    Ok(EntityRecord {
        id: EntityId(column(row, "id")?),
        kind: Kind::new(major, column(row, "kind_minor")?),
        name: column(row, "name")?,
        created: timestamp(&column(row, "created")?)?,
        terminated: opt_timestamp(&row.get::<String>("terminated").unwrap_or_default())?,
    })
}

fn row_to_relationship(row: &neo4rs::Row) -> Result<Relationship, GraphError> {
    let name: RelType = column(row, "rel_type")?
        .parse()
        .map_err(|e| GraphError::Serialization(format!("{e}")))?;
    Ok(Relationship {
        id: RelationshipId(column(row, "rel_id")?),
        related_entity_id: EntityId(column(row, "target_id")?),
        name,
        start_time: timestamp(&column(row, "start_time")?)?,
        end_time: opt_timestamp(&row.get::<String>("end_time").unwrap_or_default())?,
    })
}
