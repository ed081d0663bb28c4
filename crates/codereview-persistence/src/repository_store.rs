//! Versioned repository backed by a plain directory tree.

use std::path::{Component, Path, PathBuf};

use codereview_models::ProjectId;
use tracing::trace;

use crate::atomic::{atomic_write, read_bytes};
use crate::error::{PersistenceError, Result};

/// A repository whose locations are `/`-separated paths below a root
/// directory.
///
/// Each project scope is rooted at `/{project_id}`:
/// ```text
/// base_path/
/// └── repository/
///     └── {project_id}/
///         └── .polarion/codereview/codereview.properties
/// ```
pub struct RepositoryStore {
    root: PathBuf,
}

impl RepositoryStore {
    /// Creates a new RepositoryStore with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            root: base_path.into().join("repository"),
        }
    }

    /// Returns the root location of a project scope.
    pub fn project_location(&self, project_id: &ProjectId) -> String {
        format!("/{}", project_id)
    }

    /// Maps a location onto the file system, rejecting escapes from the root.
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(PersistenceError::InvalidLocation(location.to_string())),
            }
        }
        if path == self.root {
            return Err(PersistenceError::InvalidLocation(location.to_string()));
        }
        Ok(path)
    }

    /// Reads the content at `location`.
    pub fn read(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location)?;
        trace!(location = %location, "reading repository content");
        if !path.is_file() {
            return Err(PersistenceError::NotFound {
                kind: "repository location",
                id: location.to_string(),
            });
        }
        read_bytes(&path)
    }

    /// Writes `content` at `location`, replacing previous content atomically.
    pub fn write(&self, location: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(location)?;
        atomic_write(&path, content)
    }
}
