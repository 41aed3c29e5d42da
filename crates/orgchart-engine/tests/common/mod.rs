//! Shared fixtures for engine tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use orgchart_core::command::TransactionFields;
use orgchart_core::{Command, EntityCounters, Operation, Relationship};
use orgchart_engine::{Result, TransactionEngine};
use orgchart_graph::InMemoryStore;

pub const GOV: &str = "Government of Sri Lanka";

/// An engine over an empty store with the government bootstrapped and every
/// kind the tests create seeded at zero.
pub async fn engine() -> TransactionEngine<InMemoryStore> {
    let counters = EntityCounters::seeded(["minister", "department", "citizen", "document"]);
    let mut engine = TransactionEngine::new(InMemoryStore::new(), counters);
    engine.bootstrap_government().await.unwrap();
    engine.take_steps();
    engine
}

pub fn fields(pairs: &[(&str, &str)]) -> TransactionFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub async fn run(
    engine: &mut TransactionEngine<InMemoryStore>,
    operation: Operation,
    pairs: &[(&str, &str)],
) -> Result<u32> {
    let command = Command::from_fields(operation, &fields(pairs)).unwrap();
    engine.apply(&command).await
}

pub async fn add_minister(
    engine: &mut TransactionEngine<InMemoryStore>,
    name: &str,
    date: &str,
    tx: &str,
) -> u32 {
    run(
        engine,
        Operation::AddOrganisation,
        &[
            ("parent", GOV),
            ("child", name),
            ("date", date),
            ("parent_type", "government"),
            ("child_type", "minister"),
            ("rel_type", "AS_MINISTER"),
            ("transaction_id", tx),
        ],
    )
    .await
    .unwrap()
}

pub async fn add_department(
    engine: &mut TransactionEngine<InMemoryStore>,
    minister: &str,
    name: &str,
    date: &str,
    tx: &str,
) -> u32 {
    run(
        engine,
        Operation::AddOrganisation,
        &[
            ("parent", minister),
            ("child", name),
            ("date", date),
            ("parent_type", "minister"),
            ("child_type", "department"),
            ("rel_type", "AS_DEPARTMENT"),
            ("transaction_id", tx),
        ],
    )
    .await
    .unwrap()
}

/// The relationship entry `source_target` owned by `source`.
pub async fn edge(
    engine: &TransactionEngine<InMemoryStore>,
    source: &str,
    target: &str,
) -> Option<Relationship> {
    engine
        .store()
        .relationship(source, &format!("{source}_{target}"))
        .await
}

/// Targets of the active `rel_type` edges owned by `source`.
pub async fn active_targets(
    engine: &TransactionEngine<InMemoryStore>,
    source: &str,
    rel_type: orgchart_core::RelType,
) -> Vec<String> {
    engine
        .store()
        .entity(source)
        .await
        .unwrap()
        .active_relationships()
        .filter(|rel| rel.name == rel_type)
        .map(|rel| rel.related_entity_id.0.clone())
        .collect()
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}
