//! Name and relationship lookups over the entity store.
//!
//! Names are assumed unique within a (major, minor) scope. More than one
//! match is reported as ambiguous, never resolved by picking one.

use orgchart_core::{
    EntityId, EntityRecord, KindMajor, Relationship, RelationshipFilter, SearchCriteria,
};
use orgchart_graph::EntityStore;

use crate::error::{EngineError, Result, StoreResultExt};

/// Criteria for an organisation of the given minor kind and name.
pub fn organisation(minor: &str, name: &str) -> SearchCriteria {
    SearchCriteria::kind(KindMajor::Organisation, Some(minor)).named(name)
}

/// Resolve criteria to exactly one entity.
pub async fn find_one<S: EntityStore>(
    store: &S,
    role: &'static str,
    criteria: &SearchCriteria,
) -> Result<EntityRecord> {
    find_existing(store, role, criteria)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            role,
            name: describe(criteria),
        })
}

/// Resolve criteria to at most one entity.
pub async fn find_existing<S: EntityStore>(
    store: &S,
    role: &'static str,
    criteria: &SearchCriteria,
) -> Result<Option<EntityRecord>> {
    let mut found = store
        .search_entities(criteria)
        .await
        .with_context(|| format!("failed to search for {role}"))?;

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(EngineError::AmbiguousMatch {
            role,
            criteria: criteria.to_string(),
            count,
        }),
    }
}

/// Every relationship owned by `id` with no end time.
pub async fn active_relationships<S: EntityStore>(
    store: &S,
    id: &EntityId,
) -> Result<Vec<Relationship>> {
    let mut rels = all_relationships(store, id).await?;
    rels.retain(Relationship::is_active);
    Ok(rels)
}

/// Full relationship history owned by `id`, active and closed.
pub async fn all_relationships<S: EntityStore>(
    store: &S,
    id: &EntityId,
) -> Result<Vec<Relationship>> {
    store
        .get_all_related_entities(id)
        .await
        .with_context(|| format!("failed to get relationships of {id}"))
}

/// Relationships owned by `id` matching `filter`.
pub async fn related<S: EntityStore>(
    store: &S,
    id: &EntityId,
    filter: &RelationshipFilter,
) -> Result<Vec<Relationship>> {
    store
        .get_related_entities(id, filter)
        .await
        .with_context(|| format!("failed to get relationship of {id}"))
}

fn describe(criteria: &SearchCriteria) -> String {
    match (&criteria.name, &criteria.id) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => criteria.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use orgchart_core::{Entity, Kind};
    use orgchart_graph::InMemoryStore;

    async fn store_with(names: &[(&str, &str)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for (id, name) in names {
            let entity = Entity::new(
                EntityId::from(*id),
                Kind::organisation("minister"),
                *name,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            );
            store.create_entity(&entity).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn zero_matches_is_not_found() {
        let store = store_with(&[]).await;
        let err = find_one(&store, "parent entity", &organisation("minister", "Ministry of Ghosts"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "parent entity not found: Ministry of Ghosts");
    }

    #[tokio::test]
    async fn duplicate_names_are_ambiguous() {
        let store = store_with(&[("m1", "Ministry of Health"), ("m2", "Ministry of Health")]).await;
        let err = find_one(&store, "minister", &organisation("minister", "Ministry of Health"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn single_match_resolves() {
        let store = store_with(&[("m1", "Ministry of Health"), ("m2", "Ministry of Trade")]).await;
        let found = find_one(&store, "minister", &organisation("minister", "Ministry of Trade"))
            .await
            .unwrap();
        assert_eq!(found.id.as_str(), "m2");
    }
}
