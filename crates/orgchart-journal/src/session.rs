//! Builder for journal entries, filled in while a command runs.
//!
//! ```no_run
//! # use orgchart_journal::JournalSession;
//! let mut session = JournalSession::new("rename_minister", Some("TX00001"));
//! session.set_command(serde_json::json!({"old": "Ministry of Health", "new": "Ministry of Wellness"}));
//! session.record_steps(Vec::new());
//! let entry = session.applied(1).unwrap();
//! assert!(entry.content_hash.is_some());
//! ```

use chrono::Utc;

use orgchart_core::AppliedStep;

use crate::store::JournalError;
use crate::{JournalEntry, JournalId, Outcome};

pub struct JournalSession {
    entry: JournalEntry,
}

impl JournalSession {
    /// Start recording a command.
    pub fn new(operation: &str, transaction_id: Option<&str>) -> Self {
        Self {
            entry: JournalEntry {
                id: JournalId::new(),
                transaction_id: transaction_id.map(str::to_string),
                operation: operation.to_string(),
                command: serde_json::Value::Null,
                steps: Vec::new(),
                outcome: None,
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    pub fn set_command(&mut self, command: serde_json::Value) {
        self.entry.command = command;
    }

    /// Append completed store writes.
    pub fn record_steps(&mut self, steps: impl IntoIterator<Item = AppliedStep>) {
        self.entry.steps.extend(steps);
    }

    pub fn id(&self) -> JournalId {
        self.entry.id
    }

    /// Finalize as a completed command.
    pub fn applied(self, counter: u32) -> Result<JournalEntry, JournalError> {
        self.finalize(Outcome::Applied { counter })
    }

    /// Finalize as a failed command.
    pub fn failed(self, error: &str) -> Result<JournalEntry, JournalError> {
        self.finalize(Outcome::Failed {
            error: error.to_string(),
        })
    }

    fn finalize(mut self, outcome: Outcome) -> Result<JournalEntry, JournalError> {
        self.entry.outcome = Some(outcome);
        self.entry.completed_at = Some(Utc::now());
        let hash = self.entry.compute_hash()?;
        self.entry.content_hash = Some(hash);
        Ok(self.entry)
    }
}
