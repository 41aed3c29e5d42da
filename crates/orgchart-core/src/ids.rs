//! Deterministic identifier allocation.
//!
//! A new entity id is fully determined by the transaction id, the kind label
//! and that kind's next counter value: `<first 7 chars of tx id>_<kind code>_<n>`,
//! e.g. `TX00001_min_1`. Replaying a transaction against the same counters
//! reproduces the same id, which the store rejects as a duplicate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, ValidationError};
use crate::types::EntityId;

const TX_PREFIX_LEN: usize = 7;
const KIND_CODE_LEN: usize = 3;

/// Identifier of the upstream transaction that requested a change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.chars().count() < TX_PREFIX_LEN {
            return Err(ValidationError::TransactionIdTooShort(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first seven characters, used as the id prefix.
    pub fn prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(TX_PREFIX_LEN)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-letter lowercase code of a kind label (`minister` -> `min`).
pub fn kind_code(kind: &str) -> Result<String, ValidationError> {
    let code: String = kind
        .chars()
        .take(KIND_CODE_LEN)
        .flat_map(char::to_lowercase)
        .collect();
    if kind.chars().count() < KIND_CODE_LEN {
        return Err(ValidationError::KindLabelTooShort(kind.to_string()));
    }
    Ok(code)
}

/// The entity id for a given transaction, kind label and counter value.
pub fn entity_id(tx: &TransactionId, kind: &str, counter: u32) -> Result<EntityId, ValidationError> {
    Ok(EntityId(format!("{}_{}_{}", tx.prefix(), kind_code(kind)?, counter)))
}

/// A new id reserved against the counter table, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: EntityId,
    pub kind: String,
    pub counter: u32,
}

/// Per-kind last-used counters: the allocation context of a transaction batch.
///
/// Every kind a batch may create must be seeded. The table is an owned value:
/// the engine takes it in, advances it as entities are created, and hands it
/// back when the batch is done.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EntityCounters(BTreeMap<String, u32>);

impl EntityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every listed kind at zero.
    pub fn seeded<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self(kinds.into_iter().map(|k| (k.into(), 0)).collect())
    }

    pub fn with(mut self, kind: impl Into<String>, last_used: u32) -> Self {
        self.0.insert(kind.into(), last_used);
        self
    }

    pub fn get(&self, kind: &str) -> Option<u32> {
        self.0.get(kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Reserve the next id for `kind`. Pure: the table is not changed until
    /// the allocation is committed.
    pub fn allocate(&self, tx: &TransactionId, kind: &str) -> Result<Allocation, AllocationError> {
        let last = self.get(kind).ok_or_else(|| AllocationError::UnknownKind {
            kind: kind.to_string(),
        })?;
        let counter = last
            .checked_add(1)
            .ok_or_else(|| ValidationError::CounterExhausted {
                kind: kind.to_string(),
                last,
            })?;
        Ok(Allocation {
            id: entity_id(tx, kind, counter)?,
            kind: kind.to_string(),
            counter,
        })
    }

    /// Record an allocation whose entity the store accepted.
    pub fn commit(&mut self, allocation: &Allocation) {
        let slot = self.0.entry(allocation.kind.clone()).or_insert(0);
        *slot = (*slot).max(allocation.counter);
    }
}

impl From<BTreeMap<String, u32>> for EntityCounters {
    fn from(map: BTreeMap<String, u32>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for EntityCounters {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
