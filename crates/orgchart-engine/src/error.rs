//! Error types for the orgchart-engine crate.

use thiserror::Error;

use orgchart_core::{AllocationError, ValidationError};
use orgchart_graph::GraphError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid transaction: {0}")]
    Validation(#[from] ValidationError),

    #[error("unknown child type: {kind} (no counter seeded)")]
    UnknownKind { kind: String },

    #[error("{role} not found: {name}")]
    NotFound { role: &'static str, name: String },

    #[error("{role} is ambiguous: {count} entities match {criteria}")]
    AmbiguousMatch {
        role: &'static str,
        criteria: String,
        count: usize,
    },

    #[error("cannot terminate minister with active departments: {minister} has {active} active")]
    BlockedByActiveDependents { minister: String, active: usize },

    #[error("no active relationship found between {parent} and {child} with type {rel_type}")]
    NoActiveRelationship {
        parent: String,
        child: String,
        rel_type: String,
    },

    #[error("no active minister relationship found for department: {department}")]
    NoActiveMinister { department: String },

    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: GraphError,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<AllocationError> for EngineError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::UnknownKind { kind } => Self::UnknownKind { kind },
            AllocationError::Validation(v) => Self::Validation(v),
        }
    }
}

/// Attach operation context to store failures.
pub trait StoreResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> StoreResultExt<T> for std::result::Result<T, GraphError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| EngineError::Store {
            context: context.into(),
            source,
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| EngineError::Store {
            context: f(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseeded_kind_maps_to_unknown_kind() {
        let err: EngineError = AllocationError::UnknownKind {
            kind: "department".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "unknown child type: department (no counter seeded)"
        );
    }

    #[test]
    fn store_errors_carry_context() {
        let result: std::result::Result<(), GraphError> = Err(GraphError::NotFound {
            id: "m1".to_string(),
        });
        let err = result.context("failed to search for parent entity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to search for parent entity: Entity not found: m1"
        );
    }

    #[test]
    fn blocked_minister_message_prefix() {
        let err = EngineError::BlockedByActiveDependents {
            minister: "Ministry of Health".to_string(),
            active: 1,
        };
        assert!(err
            .to_string()
            .starts_with("cannot terminate minister with active departments"));
    }
}
