//! Error types for the review engine.

use codereview_persistence::PersistenceError;
use thiserror::Error;

use crate::context::Location;

/// Errors that can occur while evaluating or updating a review.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Reading the configuration file failed.
    #[error("failed to read review configuration from {location}: {message}")]
    ConfigurationRead { location: Location, message: String },

    /// The configuration file is not valid properties text.
    #[error("invalid review configuration at line {line}: {message}")]
    ConfigurationSyntax { line: usize, message: String },

    /// The fast-track location pattern is not configured.
    #[error("fastTrackPermittedLocationPattern is not configured")]
    MissingFastTrackPattern,

    /// The fast-track location pattern does not compile.
    #[error("invalid fastTrackPermittedLocationPattern {pattern:?}: {source}")]
    InvalidFastTrackPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The stored last reviewed revision is not a number.
    #[error("last reviewed revision {value:?} is not a number: {source}")]
    RevisionParse {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A required request parameter is missing.
    #[error("missing request parameter: {0}")]
    MissingParameter(&'static str),

    /// Unknown workflow action tag.
    #[error("unknown workflow action: {0}")]
    UnknownWorkflowAction(String),

    /// A write needs a field that the configuration does not name.
    #[error("{key} is not configured")]
    FieldNotConfigured { key: &'static str },

    /// The workflow action to perform on a successful review is not configured.
    #[error("successfulReviewWorkflowAction is not configured")]
    WorkflowActionNotConfigured,

    /// No handler is registered for a workflow action tag.
    #[error("no handler registered for workflow action {0}")]
    NoWorkflowActionHandler(String),

    /// The item store rejected an operation.
    #[error("item store error: {0}")]
    ItemStore(String),

    /// The security provider failed.
    #[error("security error: {0}")]
    Security(String),

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
