use thiserror::Error;

/// A malformed or incomplete transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required and must be a non-empty string")]
    MissingField { field: &'static str },

    #[error("failed to parse date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("unknown relationship type: {0}")]
    UnknownRelType(String),

    #[error("unknown kind: {0}")]
    UnknownKindMajor(String),

    #[error("transaction id '{0}' is shorter than 7 characters")]
    TransactionIdTooShort(String),

    #[error("kind label '{0}' is shorter than 3 characters")]
    KindLabelTooShort(String),

    #[error("{field} must list at least one name")]
    EmptyList { field: &'static str },

    #[error("{field} contains an empty name")]
    EmptyListEntry { field: &'static str },

    #[error("old and new parent are the same entity: {0}")]
    SameParent(String),

    #[error("counter for {kind} cannot advance past {last}")]
    CounterExhausted { kind: String, last: u32 },
}

/// Failure to derive a new entity id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("unknown child type: {kind} (no counter seeded)")]
    UnknownKind { kind: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
