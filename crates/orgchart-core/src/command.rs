//! Strongly-typed transaction commands.
//!
//! Upstream producers describe a change as a bag of string fields
//! (`parent`, `child`, `date`, `rel_type`, ...). Each [`Operation`] requires a
//! different subset. [`Command::from_fields`] validates the bag once, so the
//! engine only ever sees complete, well-formed commands.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::TransactionId;
use crate::types::RelType;

/// The raw input field bag.
pub type TransactionFields = BTreeMap<String, String>;

/// The operations a transaction can request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AddOrganisation,
    AddPerson,
    AddDocument,
    TerminateOrganisation,
    TerminatePerson,
    MoveDepartment,
    MovePerson,
    RenameMinister,
    RenameDepartment,
    MergeMinisters,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::AddOrganisation,
        Operation::AddPerson,
        Operation::AddDocument,
        Operation::TerminateOrganisation,
        Operation::TerminatePerson,
        Operation::MoveDepartment,
        Operation::MovePerson,
        Operation::RenameMinister,
        Operation::RenameDepartment,
        Operation::MergeMinisters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddOrganisation => "add_organisation",
            Self::AddPerson => "add_person",
            Self::AddDocument => "add_document",
            Self::TerminateOrganisation => "terminate_organisation",
            Self::TerminatePerson => "terminate_person",
            Self::MoveDepartment => "move_department",
            Self::MovePerson => "move_person",
            Self::RenameMinister => "rename_minister",
            Self::RenameDepartment => "rename_department",
            Self::MergeMinisters => "merge_ministers",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownOperation(s.to_string()))
    }
}

/// The calendar day a change takes effect, normalised to UTC midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EffectiveDate(NaiveDate);

impl EffectiveDate {
    /// Parse a `YYYY-MM-DD` date. Surrounding whitespace is ignored; any
    /// other format is rejected.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|source| ValidationError::InvalidDate {
                value: raw.to_string(),
                source,
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC of this day.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ── Command payloads ──────────────────────────────────────────────

/// Create (or, for people, reuse) a child entity and attach it to a parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddEntity {
    pub parent: String,
    pub parent_type: String,
    pub child: String,
    pub child_type: String,
    pub rel_type: RelType,
    pub date: EffectiveDate,
    pub transaction_id: TransactionId,
}

/// Create (or reuse) a document and attach it with `AS_DOCUMENT`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddDocument {
    pub parent: String,
    pub parent_type: String,
    pub child: String,
    pub child_type: String,
    pub date: EffectiveDate,
    pub transaction_id: TransactionId,
}

/// Close the active edge between a parent and a child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminateEntity {
    pub parent: String,
    pub parent_type: String,
    pub child: String,
    pub child_type: String,
    pub rel_type: RelType,
    pub date: EffectiveDate,
}

/// Re-parent a child from one minister to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveChild {
    pub old_parent: String,
    pub new_parent: String,
    pub child: String,
    pub date: EffectiveDate,
}

/// Replace an entity by a successor with a new name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rename {
    pub old: String,
    pub new: String,
    pub date: EffectiveDate,
    pub transaction_id: TransactionId,
}

/// Fold several ministers into a new one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Merge {
    pub old: Vec<String>,
    pub new: String,
    pub date: EffectiveDate,
    pub transaction_id: TransactionId,
}

/// A validated transaction, one variant per operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Command {
    AddOrganisation(AddEntity),
    AddPerson(AddEntity),
    AddDocument(AddDocument),
    TerminateOrganisation(TerminateEntity),
    TerminatePerson(TerminateEntity),
    MoveDepartment(MoveChild),
    MovePerson(MoveChild),
    RenameMinister(Rename),
    RenameDepartment(Rename),
    MergeMinisters(Merge),
}

impl Command {
    /// Validate a field bag for the given operation.
    pub fn from_fields(
        operation: Operation,
        fields: &TransactionFields,
    ) -> Result<Self, ValidationError> {
        let command = match operation {
            Operation::AddOrganisation => Self::AddOrganisation(add_entity(fields)?),
            Operation::AddPerson => Self::AddPerson(add_entity(fields)?),
            Operation::AddDocument => Self::AddDocument(AddDocument {
                parent: required(fields, "parent")?,
                parent_type: required(fields, "parent_type")?,
                child: required(fields, "child")?,
                child_type: required(fields, "child_type")?,
                date: date(fields)?,
                transaction_id: transaction_id(fields)?,
            }),
            Operation::TerminateOrganisation => Self::TerminateOrganisation(terminate(fields)?),
            Operation::TerminatePerson => Self::TerminatePerson(terminate(fields)?),
            Operation::MoveDepartment => Self::MoveDepartment(move_child(fields)?),
            Operation::MovePerson => Self::MovePerson(move_child(fields)?),
            Operation::RenameMinister => Self::RenameMinister(rename(fields)?),
            Operation::RenameDepartment => Self::RenameDepartment(rename(fields)?),
            Operation::MergeMinisters => Self::MergeMinisters(Merge {
                old: parse_name_list(&required(fields, "old")?, "old")?,
                new: required(fields, "new")?,
                date: date(fields)?,
                transaction_id: transaction_id(fields)?,
            }),
        };
        Ok(command)
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::AddOrganisation(_) => Operation::AddOrganisation,
            Self::AddPerson(_) => Operation::AddPerson,
            Self::AddDocument(_) => Operation::AddDocument,
            Self::TerminateOrganisation(_) => Operation::TerminateOrganisation,
            Self::TerminatePerson(_) => Operation::TerminatePerson,
            Self::MoveDepartment(_) => Operation::MoveDepartment,
            Self::MovePerson(_) => Operation::MovePerson,
            Self::RenameMinister(_) => Operation::RenameMinister,
            Self::RenameDepartment(_) => Operation::RenameDepartment,
            Self::MergeMinisters(_) => Operation::MergeMinisters,
        }
    }

    /// The transaction id, for operations that may create entities.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::AddOrganisation(c) | Self::AddPerson(c) => Some(&c.transaction_id),
            Self::AddDocument(c) => Some(&c.transaction_id),
            Self::RenameMinister(c) | Self::RenameDepartment(c) => Some(&c.transaction_id),
            Self::MergeMinisters(c) => Some(&c.transaction_id),
            Self::TerminateOrganisation(_)
            | Self::TerminatePerson(_)
            | Self::MoveDepartment(_)
            | Self::MovePerson(_) => None,
        }
    }
}

/// One entry of a transaction batch as produced upstream: the operation
/// name plus its string fields, e.g.
/// `{"operation": "move_department", "old_parent": "...", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub operation: String,
    #[serde(flatten)]
    pub fields: TransactionFields,
}

impl TransactionRecord {
    pub fn to_command(&self) -> Result<Command, ValidationError> {
        let operation: Operation = self.operation.trim().parse()?;
        Command::from_fields(operation, &self.fields)
    }
}

// ── Field extraction ──────────────────────────────────────────────

fn required(fields: &TransactionFields, field: &'static str) -> Result<String, ValidationError> {
    fields
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField { field })
}

fn date(fields: &TransactionFields) -> Result<EffectiveDate, ValidationError> {
    EffectiveDate::parse(&required(fields, "date")?)
}

fn transaction_id(fields: &TransactionFields) -> Result<TransactionId, ValidationError> {
    TransactionId::parse(&required(fields, "transaction_id")?)
}

fn rel_type(fields: &TransactionFields) -> Result<RelType, ValidationError> {
    required(fields, "rel_type")?.parse()
}

fn add_entity(fields: &TransactionFields) -> Result<AddEntity, ValidationError> {
    Ok(AddEntity {
        parent: required(fields, "parent")?,
        parent_type: required(fields, "parent_type")?,
        child: required(fields, "child")?,
        child_type: required(fields, "child_type")?,
        rel_type: rel_type(fields)?,
        date: date(fields)?,
        transaction_id: transaction_id(fields)?,
    })
}

fn terminate(fields: &TransactionFields) -> Result<TerminateEntity, ValidationError> {
    Ok(TerminateEntity {
        parent: required(fields, "parent")?,
        parent_type: required(fields, "parent_type")?,
        child: required(fields, "child")?,
        child_type: required(fields, "child_type")?,
        rel_type: rel_type(fields)?,
        date: date(fields)?,
    })
}

fn move_child(fields: &TransactionFields) -> Result<MoveChild, ValidationError> {
    Ok(MoveChild {
        old_parent: required(fields, "old_parent")?,
        new_parent: required(fields, "new_parent")?,
        child: required(fields, "child")?,
        date: date(fields)?,
    })
}

fn rename(fields: &TransactionFields) -> Result<Rename, ValidationError> {
    Ok(Rename {
        old: required(fields, "old")?,
        new: required(fields, "new")?,
        date: date(fields)?,
        transaction_id: transaction_id(fields)?,
    })
}

/// Parse `[A, B, C]` (brackets optional) into trimmed names.
pub fn parse_name_list(raw: &str, field: &'static str) -> Result<Vec<String>, ValidationError> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    if inner.is_empty() {
        return Err(ValidationError::EmptyList { field });
    }
    inner
        .split(',')
        .map(|name| {
            let name = name.trim();
            if name.is_empty() {
                Err(ValidationError::EmptyListEntry { field })
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}
