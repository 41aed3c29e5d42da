//! Orgchart Graph: entity store client for the organisation graph.
//!
//! The transaction engine reaches the graph only through the [`EntityStore`]
//! trait. Two backends implement it: [`GraphClient`] over Neo4j, and
//! [`InMemoryStore`] for tests and dry runs. [`TimeoutStore`] bounds every
//! call of any backend with a caller-imposed deadline.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::InMemoryStore;
pub use store::{EntityStore, TimeoutStore};
