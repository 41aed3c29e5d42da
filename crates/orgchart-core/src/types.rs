//! Core domain types for the organisation graph.
//!
//! Entities are nodes (the government, ministers, departments, people,
//! documents). Relationships are directed, typed, time-bounded edges owned
//! by their source entity. A relationship with no end time is *active*.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Well-known constants ──────────────────────────────────────────

/// Id of the root government entity.
pub const GOVERNMENT_ID: &str = "gov_01";

/// Display name of the root government entity.
pub const GOVERNMENT_NAME: &str = "Government of Sri Lanka";

/// Day from which the root government entity exists.
pub const GOVERNMENT_FOUNDED: &str = "2024-01-01";

/// Minor kind labels used by the composite operations.
pub const GOVERNMENT: &str = "government";
pub const MINISTER: &str = "minister";
pub const DEPARTMENT: &str = "department";
pub const CITIZEN: &str = "citizen";

/// Counter label shared by every document minor kind.
pub const DOCUMENT_COUNTER: &str = "document";

// ── Identifiers ───────────────────────────────────────────────────

/// Unique, immutable identifier of an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a relationship, also its key inside the owning entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RelationshipId(pub String);

impl RelationshipId {
    /// The deterministic id of the edge `source -> target`: `source_target`.
    pub fn between(source: &EntityId, target: &EntityId) -> Self {
        Self(format!("{}_{}", source.0, target.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Kinds ─────────────────────────────────────────────────────────

/// Broad category of an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KindMajor {
    Organisation,
    Person,
    Document,
}

impl KindMajor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organisation => "Organisation",
            Self::Person => "Person",
            Self::Document => "Document",
        }
    }
}

impl fmt::Display for KindMajor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindMajor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Organisation" => Ok(Self::Organisation),
            "Person" => Ok(Self::Person),
            "Document" => Ok(Self::Document),
            other => Err(ValidationError::UnknownKindMajor(other.to_string())),
        }
    }
}

/// The (major, minor) classification of an entity, e.g. (Organisation, minister).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Kind {
    pub major: KindMajor,
    pub minor: String,
}

impl Kind {
    pub fn new(major: KindMajor, minor: impl Into<String>) -> Self {
        Self {
            major,
            minor: minor.into(),
        }
    }

    pub fn organisation(minor: impl Into<String>) -> Self {
        Self::new(KindMajor::Organisation, minor)
    }

    pub fn person(minor: impl Into<String>) -> Self {
        Self::new(KindMajor::Person, minor)
    }

    pub fn document(minor: impl Into<String>) -> Self {
        Self::new(KindMajor::Document, minor)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.major, self.minor)
    }
}

// ── Time ──────────────────────────────────────────────────────────

/// A value paired with the instant from which it has held.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBasedValue<T> {
    pub start_time: DateTime<Utc>,
    pub value: T,
}

/// Render a timestamp in the store's wire form: `2024-03-01T00:00:00Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

// ── Entities ──────────────────────────────────────────────────────

/// A node in the organisation graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: Kind,
    pub created: DateTime<Utc>,
    pub terminated: Option<DateTime<Utc>>,
    pub name: TimeBasedValue<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub relationships: BTreeMap<RelationshipId, Relationship>,
}

impl Entity {
    /// A fresh entity with empty metadata, attributes and relationships.
    /// The name holds from the creation instant.
    pub fn new(id: EntityId, kind: Kind, name: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            created,
            terminated: None,
            name: TimeBasedValue {
                start_time: created,
                value: name.into(),
            },
            metadata: BTreeMap::new(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Lightweight projection without the relationship collection.
    pub fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id.clone(),
            kind: self.kind.clone(),
            name: self.name.value.clone(),
            created: self.created,
            terminated: self.terminated,
        }
    }

    pub fn active_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values().filter(|r| r.is_active())
    }
}

/// A lightweight record returned from entity searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: Kind,
    pub name: String,
    pub created: DateTime<Utc>,
    pub terminated: Option<DateTime<Utc>>,
}

// ── Relationships ─────────────────────────────────────────────────

/// Fixed relationship vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    AsMinister,
    AsDepartment,
    AsAppointed,
    AsDocument,
    RenamedTo,
    MergedInto,
}

impl RelType {
    pub const ALL: [RelType; 6] = [
        RelType::AsMinister,
        RelType::AsDepartment,
        RelType::AsAppointed,
        RelType::AsDocument,
        RelType::RenamedTo,
        RelType::MergedInto,
    ];

    /// The tag as stored, also used as the Cypher relationship type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AsMinister => "AS_MINISTER",
            Self::AsDepartment => "AS_DEPARTMENT",
            Self::AsAppointed => "AS_APPOINTED",
            Self::AsDocument => "AS_DOCUMENT",
            Self::RenamedTo => "RENAMED_TO",
            Self::MergedInto => "MERGED_INTO",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRelType(s.to_string()))
    }
}

/// A directed, typed, time-bounded edge owned by its source entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub id: RelationshipId,
    pub related_entity_id: EntityId,
    pub name: RelType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Relationship {
    /// A new active edge `source -> target` keyed by the endpoint pair.
    pub fn new(
        source: &EntityId,
        target: &EntityId,
        name: RelType,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::between(source, target),
            related_entity_id: target.clone(),
            name,
            start_time,
            end_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whether the edge was in effect at `at`: started at or before it and
    /// not yet ended.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && self.end_time.map_or(true, |end| end > at)
    }
}

/// A single change to an entity's relationship collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelationshipUpdate {
    /// Insert the entry, overwriting any entry with the same key.
    Upsert(Relationship),
    /// Set the end time of an existing entry, leaving its other fields untouched.
    Close {
        id: RelationshipId,
        end_time: DateTime<Utc>,
    },
}

/// Partial entity update. Only the listed relationship entries change;
/// sibling entries and identity fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityPatch {
    pub relationships: Vec<RelationshipUpdate>,
}

impl EntityPatch {
    pub fn attach(relationship: Relationship) -> Self {
        Self {
            relationships: vec![RelationshipUpdate::Upsert(relationship)],
        }
    }

    pub fn close(id: RelationshipId, end_time: DateTime<Utc>) -> Self {
        Self {
            relationships: vec![RelationshipUpdate::Close { id, end_time }],
        }
    }
}

// ── Search ────────────────────────────────────────────────────────

/// Kind constraint of a search. A missing minor matches any minor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KindFilter {
    pub major: KindMajor,
    pub minor: Option<String>,
}

/// Entity search criteria. Fields are ANDed; `None` is a wildcard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchCriteria {
    pub kind: Option<KindFilter>,
    pub name: Option<String>,
    pub id: Option<EntityId>,
}

impl SearchCriteria {
    pub fn kind(major: KindMajor, minor: Option<&str>) -> Self {
        Self {
            kind: Some(KindFilter {
                major,
                minor: minor.map(str::to_string),
            }),
            ..Default::default()
        }
    }

    pub fn by_id(id: &EntityId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn matches(&self, record: &EntityRecord) -> bool {
        if let Some(kind) = &self.kind {
            if record.kind.major != kind.major {
                return false;
            }
            if let Some(minor) = &kind.minor {
                if &record.kind.minor != minor {
                    return false;
                }
            }
        }
        if let Some(name) = &self.name {
            if &record.name != name {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(kind) = &self.kind {
            match &kind.minor {
                Some(minor) => parts.push(format!("kind={}/{minor}", kind.major)),
                None => parts.push(format!("kind={}", kind.major)),
            }
        }
        if let Some(name) = &self.name {
            parts.push(format!("name={name:?}"));
        }
        if let Some(id) = &self.id {
            parts.push(format!("id={id}"));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Relationship lookup filter. `active_at` keeps only edges in effect at
/// that instant (started at or before it, not ended by it).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipFilter {
    pub related_entity_id: Option<EntityId>,
    pub name: Option<RelType>,
    pub active_at: Option<DateTime<Utc>>,
}

impl RelationshipFilter {
    pub fn matches(&self, rel: &Relationship) -> bool {
        if let Some(target) = &self.related_entity_id {
            if &rel.related_entity_id != target {
                return false;
            }
        }
        if let Some(name) = self.name {
            if rel.name != name {
                return false;
            }
        }
        if let Some(at) = self.active_at {
            if !rel.is_active_at(at) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn rel_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&RelType::AsDepartment).unwrap();
        assert_eq!(json, "\"AS_DEPARTMENT\"");

        let json = serde_json::to_string(&RelType::MergedInto).unwrap();
        assert_eq!(json, "\"MERGED_INTO\"");
    }

    #[test]
    fn rel_type_parses_vocabulary_only() {
        assert_eq!("RENAMED_TO".parse::<RelType>().unwrap(), RelType::RenamedTo);
        assert!(matches!(
            "AS_FRIEND".parse::<RelType>(),
            Err(ValidationError::UnknownRelType(_))
        ));
    }

    #[test]
    fn relationship_id_is_ordered_pair() {
        let a = EntityId::from("gov_01");
        let b = EntityId::from("TX00001_min_1");
        assert_eq!(RelationshipId::between(&a, &b).as_str(), "gov_01_TX00001_min_1");
        assert_ne!(RelationshipId::between(&a, &b), RelationshipId::between(&b, &a));
    }

    #[test]
    fn active_at_excludes_ended_and_future_edges() {
        let mut rel = Relationship::new(
            &EntityId::from("a"),
            &EntityId::from("b"),
            RelType::AsDepartment,
            ts(2024, 2, 1),
        );
        assert!(rel.is_active_at(ts(2024, 2, 1)));
        assert!(!rel.is_active_at(ts(2024, 1, 31)));

        rel.end_time = Some(ts(2024, 3, 1));
        assert!(rel.is_active_at(ts(2024, 2, 15)));
        assert!(!rel.is_active_at(ts(2024, 3, 1)));
        assert!(!rel.is_active());
    }

    #[test]
    fn search_criteria_minor_is_wildcard() {
        let record = Entity::new(
            EntityId::from("TX00001_cit_1"),
            Kind::person(CITIZEN),
            "A. Perera",
            ts(2024, 1, 1),
        )
        .record();

        assert!(SearchCriteria::kind(KindMajor::Person, None)
            .named("A. Perera")
            .matches(&record));
        assert!(!SearchCriteria::kind(KindMajor::Person, Some("minister")).matches(&record));
        assert!(!SearchCriteria::kind(KindMajor::Organisation, None).matches(&record));
    }

    #[test]
    fn timestamp_wire_form() {
        let t = ts(2024, 3, 1);
        assert_eq!(format_timestamp(&t), "2024-03-01T00:00:00Z");
        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z").unwrap(), t);
    }
}
