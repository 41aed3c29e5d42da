//! Batch application: records in, journal entries and counters out.

use std::path::Path;

use orgchart_core::types::{CITIZEN, DEPARTMENT, DOCUMENT_COUNTER, MINISTER};
use orgchart_core::{EntityCounters, TransactionRecord};
use orgchart_engine::TransactionEngine;
use orgchart_graph::EntityStore;
use orgchart_journal::{JournalId, JournalSession, JournalStore};

use crate::error::{ApplyError, Result};

/// What happened to one record of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Position in the batch, from 0.
    pub index: usize,
    pub operation: String,
    pub transaction_id: Option<String>,
    pub journal_id: Option<JournalId>,
    /// Allocated counter on success, the error message on failure.
    pub result: std::result::Result<u32, String>,
}

impl RecordOutcome {
    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
    /// Records left unapplied after a failure stopped the batch.
    pub skipped: usize,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}

/// Apply `records` in order.
///
/// Every record gets a journal entry when a journal is given, including
/// records that fail validation. With `stop_on_error` the batch ends at the
/// first failure and the rest are counted as skipped. Journal write failures
/// abort the batch.
pub async fn apply_batch<S, J>(
    engine: &mut TransactionEngine<S>,
    records: &[TransactionRecord],
    journal: Option<&J>,
    stop_on_error: bool,
) -> Result<BatchReport>
where
    S: EntityStore,
    J: JournalStore,
{
    let mut report = BatchReport::default();

    for (index, record) in records.iter().enumerate() {
        let transaction_id = record.fields.get("transaction_id").cloned();
        let mut session = JournalSession::new(&record.operation, transaction_id.as_deref());
        let command =
            serde_json::to_value(record).map_err(|source| ApplyError::Encode { index, source })?;
        session.set_command(command);

        let mut steps = 0;
        let result = match record.to_command() {
            Ok(command) => {
                let applied = engine.apply(&command).await;
                let completed = engine.take_steps();
                steps = completed.len();
                session.record_steps(completed);
                applied.map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("invalid transaction: {e}")),
        };

        let journal_id = session.id();
        let entry = match &result {
            Ok(counter) => session.applied(*counter)?,
            Err(error) => {
                tracing::error!(
                    index,
                    operation = %record.operation,
                    transaction_id = transaction_id.as_deref().unwrap_or(""),
                    %error,
                    steps,
                    "Transaction failed"
                );
                session.failed(error)?
            }
        };
        if let Some(journal) = journal {
            journal.save(&entry)?;
        }

        let failed = result.is_err();
        report.outcomes.push(RecordOutcome {
            index,
            operation: record.operation.clone(),
            transaction_id,
            journal_id: journal.map(|_| journal_id),
            result,
        });

        if failed && stop_on_error {
            report.skipped = records.len() - index - 1;
            tracing::warn!(skipped = report.skipped, "Stopping batch at first failure");
            break;
        }
    }

    tracing::info!(
        applied = report.applied(),
        failed = report.failed(),
        skipped = report.skipped,
        "Batch finished"
    );
    Ok(report)
}

/// [`apply_batch`], then write the engine's counters to `counters_path`
/// even if the batch aborted.
///
/// Records applied before an abort have already advanced both the store and
/// the counters.
pub async fn apply_and_save<S, J>(
    engine: &mut TransactionEngine<S>,
    records: &[TransactionRecord],
    journal: Option<&J>,
    stop_on_error: bool,
    counters_path: &Path,
) -> Result<BatchReport>
where
    S: EntityStore,
    J: JournalStore,
{
    let outcome = apply_batch(engine, records, journal, stop_on_error).await;
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Batch aborted, saving counters before exit");
    }
    save_counters(counters_path, engine.counters())?;
    outcome
}

/// Read a batch: a JSON array of transaction records.
pub fn read_records(path: &Path) -> Result<Vec<TransactionRecord>> {
    let raw = std::fs::read_to_string(path).map_err(|source| ApplyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ApplyError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the counters file, or seed every creatable kind at zero when it does
/// not exist yet.
pub fn load_counters(path: &Path) -> Result<EntityCounters> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No counters file, seeding at zero");
        return Ok(EntityCounters::seeded([
            MINISTER,
            DEPARTMENT,
            CITIZEN,
            DOCUMENT_COUNTER,
        ]));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ApplyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ApplyError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_counters(path: &Path, counters: &EntityCounters) -> Result<()> {
    let json = serde_json::to_string_pretty(counters).map_err(|source| ApplyError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ApplyError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| ApplyError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Counters saved");
    Ok(())
}
