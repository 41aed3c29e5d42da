//! orgchart-core: Shared types, identifier allocation, and transaction commands.
//!
//! This crate provides the foundational types used across all Orgchart components:
//! - Entity and relationship types for the time-versioned organisation graph
//! - Deterministic identifier allocation (entity and relationship ids)
//! - Strongly-typed transaction commands parsed from the input field bag
//! - The applied-step vocabulary and its compensations
//! - Validation errors

pub mod command;
pub mod error;
pub mod ids;
pub mod steps;
pub mod types;

pub use command::{Command, EffectiveDate, Operation, TransactionRecord};
pub use error::{AllocationError, ValidationError};
pub use ids::{Allocation, EntityCounters, TransactionId};
pub use steps::{AppliedStep, Compensation};
pub use types::{
    Entity, EntityId, EntityPatch, EntityRecord, Kind, KindMajor, RelType, Relationship,
    RelationshipFilter, RelationshipId, RelationshipUpdate, SearchCriteria,
};
