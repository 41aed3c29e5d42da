//! Journal storage: trait plus a file-system implementation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{JournalEntry, JournalId};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("Journal entry not found: {0}")]
    NotFound(JournalId),

    #[error("Integrity check failed for journal entry {0}: stored hash does not match content")]
    IntegrityViolation(JournalId),

    #[error("Journal entry has no content hash (not finalized)")]
    NotFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JournalError>;

/// Filters for listing journal entries. Fields are ANDed.
#[derive(Debug, Default)]
pub struct JournalQuery {
    pub transaction_id: Option<String>,
    pub operation: Option<String>,
    /// Only entries whose command failed.
    pub failed_only: bool,
    /// Only entries started at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only entries started at or before this time.
    pub to: Option<DateTime<Utc>>,
}

pub trait JournalStore {
    /// Store a finalized entry. Fails if the entry has no content hash.
    fn save(&self, entry: &JournalEntry) -> Result<()>;

    /// Retrieve an entry by id, verifying integrity.
    fn get(&self, id: JournalId) -> Result<JournalEntry>;

    /// Entries matching the query, oldest first.
    fn list(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>>;
}

/// Journal entries as JSON files in a date-partitioned tree:
/// ```text
/// {root}/
///   2024/
///     03/
///       01/
///         {entry_id}.json
/// ```
pub struct FileJournalStore {
    root: PathBuf,
}

impl FileJournalStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, entry: &JournalEntry) -> PathBuf {
        let date = entry.started_at.format("%Y/%m/%d");
        self.root.join(format!("{}/{}.json", date, entry.id.0))
    }

    fn find_path(&self, id: JournalId) -> Result<PathBuf> {
        let filename = format!("{}.json", id.0);
        find_file_recursive(&self.root, &filename).ok_or(JournalError::NotFound(id))
    }
}

impl JournalStore for FileJournalStore {
    fn save(&self, entry: &JournalEntry) -> Result<()> {
        if entry.content_hash.is_none() {
            return Err(JournalError::NotFinalized);
        }

        let path = self.entry_path(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(entry)?;
        fs::write(&path, json)?;

        tracing::debug!(
            journal_id = %entry.id,
            operation = %entry.operation,
            path = %path.display(),
            "Journal entry saved"
        );

        Ok(())
    }

    fn get(&self, id: JournalId) -> Result<JournalEntry> {
        let path = self.find_path(id)?;
        let json = fs::read_to_string(&path)?;
        let entry: JournalEntry = serde_json::from_str(&json)?;

        if !entry.verify_integrity() {
            tracing::warn!(journal_id = %id, path = %path.display(), "Journal entry failed integrity check");
            return Err(JournalError::IntegrityViolation(id));
        }

        Ok(entry)
    }

    fn list(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>> {
        let mut results = Vec::new();
        collect_entries_recursive(&self.root, query, &mut results)?;
        results.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(results)
    }
}

fn find_file_recursive(dir: &Path, filename: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_file_recursive(&path, filename) {
                return Some(found);
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(filename) {
            return Some(path);
        }
    }

    None
}

fn collect_entries_recursive(
    dir: &Path,
    query: &JournalQuery,
    results: &mut Vec<JournalEntry>,
) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_entries_recursive(&path, query, results)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let json = fs::read_to_string(&path)?;
            let journal_entry: JournalEntry = serde_json::from_str(&json)?;

            if matches_query(&journal_entry, query) {
                results.push(journal_entry);
            }
        }
    }

    Ok(())
}

fn matches_query(entry: &JournalEntry, query: &JournalQuery) -> bool {
    if let Some(tx) = &query.transaction_id {
        if entry.transaction_id.as_ref() != Some(tx) {
            return false;
        }
    }
    if let Some(op) = &query.operation {
        if &entry.operation != op {
            return false;
        }
    }
    if query.failed_only && !entry.is_failed() {
        return false;
    }
    if let Some(from) = &query.from {
        if &entry.started_at < from {
            return false;
        }
    }
    if let Some(to) = &query.to {
        if &entry.started_at > to {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::JournalSession;
    use crate::Outcome;
    use chrono::TimeZone;
    use orgchart_core::{AppliedStep, Compensation, EntityId, Kind, RelType, RelationshipId};

    fn created(id: &str) -> AppliedStep {
        AppliedStep::CreateEntity {
            entity_id: EntityId::from(id),
            kind: Kind::organisation("minister"),
            name: "Ministry of Wellness".to_string(),
        }
    }

    fn attached(source: &str, target: &str) -> AppliedStep {
        let source = EntityId::from(source);
        let target = EntityId::from(target);
        AppliedStep::Attach {
            relationship_id: RelationshipId::between(&source, &target),
            source_id: source,
            target_id: target,
            rel_type: RelType::RenamedTo,
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn applied_entry(tx: &str, operation: &str) -> JournalEntry {
        let mut session = JournalSession::new(operation, Some(tx));
        session.set_command(serde_json::json!({"operation": operation, "transaction_id": tx}));
        session.record_steps([created("TX00001_min_2"), attached("m1", "TX00001_min_2")]);
        session.applied(2).unwrap()
    }

    #[test]
    fn save_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();
        let entry = applied_entry("TX00001", "rename_minister");
        let id = entry.id;

        store.save(&entry).unwrap();
        let retrieved = store.get(id).unwrap();

        assert_eq!(retrieved, entry);
        assert_eq!(retrieved.outcome, Some(Outcome::Applied { counter: 2 }));
        assert_eq!(retrieved.steps.len(), 2);
        assert!(retrieved.verify_integrity());
    }

    #[test]
    fn integrity_violation_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();
        let entry = applied_entry("TX00001", "rename_minister");
        let id = entry.id;
        store.save(&entry).unwrap();

        // Drop a step from the stored file.
        let path = store.find_path(id).unwrap();
        let mut tampered: JournalEntry =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        tampered.steps.pop();
        fs::write(&path, serde_json::to_string_pretty(&tampered).unwrap()).unwrap();

        assert!(matches!(
            store.get(id),
            Err(JournalError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn save_rejects_unfinalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();
        let mut entry = applied_entry("TX00001", "add_organisation");
        entry.content_hash = None;

        assert!(matches!(store.save(&entry), Err(JournalError::NotFinalized)));
    }

    #[test]
    fn missing_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get(JournalId::new()),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn list_filters_failed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();

        store.save(&applied_entry("TX00001", "add_organisation")).unwrap();
        let mut session = JournalSession::new("merge_ministers", Some("TX00002"));
        session.record_steps([created("TX00002_min_1")]);
        let failed = session.failed("entity not found: Ministry of Ghosts").unwrap();
        store.save(&failed).unwrap();

        let query = JournalQuery {
            failed_only: true,
            ..Default::default()
        };
        let results = store.list(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].transaction_id.as_deref(), Some("TX00002"));
        assert_eq!(
            results[0].compensations(),
            vec![Compensation::RetractEntity {
                entity_id: EntityId::from("TX00002_min_1")
            }]
        );
    }

    #[test]
    fn list_filters_by_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();

        store.save(&applied_entry("TX00001", "add_organisation")).unwrap();
        store.save(&applied_entry("TX00002", "add_organisation")).unwrap();
        store.save(&applied_entry("TX00001", "move_department")).unwrap();

        let query = JournalQuery {
            transaction_id: Some("TX00001".to_string()),
            ..Default::default()
        };
        let results = store.list(&query).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|e| e.transaction_id.as_deref() == Some("TX00001")));
    }
}
