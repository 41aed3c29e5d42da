//! BLAKE3 content hashing for tamper evidence.

use serde::Serialize;

use orgchart_core::AppliedStep;

use crate::{JournalEntry, JournalId, Outcome};

/// Hashable view of a journal entry (excludes content_hash).
#[derive(Serialize)]
struct HashableEntry<'a> {
    id: &'a JournalId,
    transaction_id: &'a Option<String>,
    operation: &'a str,
    command: &'a serde_json::Value,
    steps: &'a [AppliedStep],
    outcome: &'a Option<Outcome>,
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
}

/// Serialize every field except `content_hash` to JSON and hash the bytes.
/// Returns the hex-encoded hash.
pub fn compute_entry_hash(entry: &JournalEntry) -> Result<String, serde_json::Error> {
    let hashable = HashableEntry {
        id: &entry.id,
        transaction_id: &entry.transaction_id,
        operation: &entry.operation,
        command: &entry.command,
        steps: &entry.steps,
        outcome: &entry.outcome,
        started_at: &entry.started_at,
        completed_at: &entry.completed_at,
    };

    let json = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
