//! Orgchart Journal: tamper-evident record of applied transactions.
//!
//! One [`JournalEntry`] is written per transaction command: the command
//! payload, every store write it completed, and how it ended. Entries are
//! content-hashed with BLAKE3 on finalization and verified on read, so a
//! journal edited after the fact is detectable.
//!
//! A failed composite transaction leaves its completed writes in the graph.
//! The journal is where an operator finds them, along with the
//! compensations that would undo them.

pub mod hash;
pub mod session;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orgchart_core::{AppliedStep, Compensation};

pub use session::JournalSession;
pub use store::{FileJournalStore, JournalError, JournalQuery, JournalStore};

/// Unique identifier for a journal entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JournalId(pub Uuid);

impl JournalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JournalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JournalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a journaled command ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The command completed. `counter` is the allocated counter value, 0 when
    /// no entity was created.
    Applied { counter: u32 },
    /// The command failed; `steps` lists whatever it completed first.
    Failed { error: String },
}

/// The journal record of one transaction command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: JournalId,
    /// Upstream transaction id, when the command carries one.
    pub transaction_id: Option<String>,
    /// Operation name, e.g. `rename_minister`.
    pub operation: String,
    /// The command as received.
    pub command: serde_json::Value,
    /// Store writes completed, in order.
    pub steps: Vec<AppliedStep>,
    /// Set on finalization.
    pub outcome: Option<Outcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 content hash (hex), set on finalization.
    pub content_hash: Option<String>,
}

impl JournalEntry {
    /// Compute the BLAKE3 hash of the entry's content.
    /// The hash covers all fields except `content_hash` itself.
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        hash::compute_entry_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    pub fn verify_integrity(&self) -> bool {
        match (&self.content_hash, self.compute_hash()) {
            (Some(stored), Ok(computed)) => stored == &computed,
            _ => false,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Failed { .. }))
    }

    /// What it would take to undo this entry's writes, last write first.
    pub fn compensations(&self) -> Vec<Compensation> {
        AppliedStep::compensations(&self.steps)
    }
}
