//! Core data models for the code review engine.
//!
//! This crate provides the plain data types shared by the persistence layer,
//! the review engine and the CLI: identifiers, tracked items and their field
//! values, the per-project tracker schema (workflow transitions and
//! enumerations), linked revisions and historical snapshots.

pub mod field;
pub mod ids;
pub mod item;
pub mod revision;
pub mod schema;
pub mod snapshot;

// Re-export main types
pub use field::{EnumOption, FieldValue};
pub use ids::{ProjectId, UserId, WorkItemId};
pub use item::{ItemRef, TrackedItem, RESOLUTION_FIELD};
pub use revision::{Revision, RevisionSelection, RevisionSet};
pub use schema::{TrackerSchema, WorkflowTransition};
pub use snapshot::{HistoricalSnapshot, ItemRevision};
