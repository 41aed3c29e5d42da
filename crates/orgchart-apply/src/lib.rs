//! orgchart-apply: batch driver for the transaction engine.
//!
//! Reads a JSON array of transaction records, applies them in order through
//! a [`orgchart_engine::TransactionEngine`], journals every command and
//! persists the advanced allocation counters once the batch is done.

pub mod batch;
pub mod config;
pub mod error;

pub use batch::{
    apply_and_save, apply_batch, load_counters, read_records, save_counters, BatchReport,
    RecordOutcome,
};
pub use config::ApplyConfig;
pub use error::{ApplyError, Result};
