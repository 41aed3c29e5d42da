//! Applied-step vocabulary for composite transactions.
//!
//! Every store write an operation performs is recorded as an [`AppliedStep`].
//! A failed composite operation leaves its completed steps in the store; the
//! step log says exactly which ones, and each step names the
//! [`Compensation`] that would undo it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Kind, RelType, RelationshipId};

/// A store write that completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AppliedStep {
    /// A new entity was created.
    CreateEntity {
        entity_id: EntityId,
        kind: Kind,
        name: String,
    },
    /// A new active edge was written on `source_id`.
    Attach {
        source_id: EntityId,
        relationship_id: RelationshipId,
        target_id: EntityId,
        rel_type: RelType,
        start_time: DateTime<Utc>,
    },
    /// An active edge on `source_id` was closed.
    Detach {
        source_id: EntityId,
        relationship_id: RelationshipId,
        end_time: DateTime<Utc>,
    },
}

/// The inverse of an [`AppliedStep`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "undo", rename_all = "snake_case")]
pub enum Compensation {
    /// Remove an entity this transaction created.
    RetractEntity { entity_id: EntityId },
    /// Remove an edge this transaction attached.
    RetractRelationship {
        source_id: EntityId,
        relationship_id: RelationshipId,
    },
    /// Clear the end time this transaction set.
    ReopenRelationship {
        source_id: EntityId,
        relationship_id: RelationshipId,
    },
}

impl AppliedStep {
    pub fn compensation(&self) -> Compensation {
        match self {
            Self::CreateEntity { entity_id, .. } => Compensation::RetractEntity {
                entity_id: entity_id.clone(),
            },
            Self::Attach {
                source_id,
                relationship_id,
                ..
            } => Compensation::RetractRelationship {
                source_id: source_id.clone(),
                relationship_id: relationship_id.clone(),
            },
            Self::Detach {
                source_id,
                relationship_id,
                ..
            } => Compensation::ReopenRelationship {
                source_id: source_id.clone(),
                relationship_id: relationship_id.clone(),
            },
        }
    }

    /// Compensations for a step log, in the order they would have to run.
    pub fn compensations(steps: &[AppliedStep]) -> Vec<Compensation> {
        steps.iter().rev().map(Self::compensation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attach_step() -> AppliedStep {
        let source = EntityId::from("gov_01");
        let target = EntityId::from("TX00001_min_1");
        AppliedStep::Attach {
            relationship_id: RelationshipId::between(&source, &target),
            source_id: source,
            target_id: target,
            rel_type: RelType::AsMinister,
            start_time: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn compensations_run_in_reverse() {
        let steps = vec![
            AppliedStep::CreateEntity {
                entity_id: EntityId::from("TX00001_min_1"),
                kind: Kind::organisation("minister"),
                name: "Ministry of Health".to_string(),
            },
            attach_step(),
        ];

        let undo = AppliedStep::compensations(&steps);
        assert_eq!(
            undo,
            vec![
                Compensation::RetractRelationship {
                    source_id: EntityId::from("gov_01"),
                    relationship_id: RelationshipId("gov_01_TX00001_min_1".to_string()),
                },
                Compensation::RetractEntity {
                    entity_id: EntityId::from("TX00001_min_1"),
                },
            ]
        );
    }

    #[test]
    fn detach_is_undone_by_reopen() {
        let step = AppliedStep::Detach {
            source_id: EntityId::from("m1"),
            relationship_id: RelationshipId("m1_d1".to_string()),
            end_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        assert!(matches!(
            step.compensation(),
            Compensation::ReopenRelationship { .. }
        ));
    }

    #[test]
    fn step_payload_tags() {
        let json = serde_json::to_string(&attach_step()).unwrap();
        assert!(json.contains("\"step\":\"attach\""));
        assert!(json.contains("\"rel_type\":\"AS_MINISTER\""));
    }
}
