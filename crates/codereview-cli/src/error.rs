//! Errors reported by CLI commands.

use codereview_core::ReviewError;
use codereview_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The review engine failed.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// The state directory could not be read or written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    /// The acting user may not perform the command.
    #[error("{0}")]
    NotPermitted(String),
}
