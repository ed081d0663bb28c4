//! Error types for the file-backed stores.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`TrackerStore`](crate::TrackerStore) and
/// [`RepositoryStore`](crate::RepositoryStore).
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading a store file failed.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a store file failed.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be encoded or decoded.
    #[error("malformed store document: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// A store directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A location or id escapes its store root or is empty.
    #[error("invalid location: {0}")]
    InvalidLocation(String),
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
