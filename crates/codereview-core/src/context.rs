//! Collaborator contracts and the dependency bundle handed to the engine.
//!
//! The engine never looks services up globally. Everything it talks to is a
//! trait object in [`ReviewContext`], except the elevated repository read,
//! which only [`RepositoryConfigurationLoader`](crate::RepositoryConfigurationLoader)
//! holds through [`SystemAccess`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use codereview_models::{FieldValue, ItemRef, ProjectId, Revision, UserId, WorkflowTransition};

use crate::error::Result;

/// A `/`-separated location in the versioned repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    /// Creates a location from a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns a new location with `relative` appended.
    pub fn append(&self, relative: &str) -> Self {
        let base = self.0.trim_end_matches('/');
        let relative = relative.trim_start_matches('/');
        Self(format!("{}/{}", base, relative))
    }

    /// Returns the path of this location.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracked item access: field values, workflow and persistence.
pub trait ItemStore: Send + Sync {
    /// Returns the current status id.
    fn status(&self, item: &ItemRef) -> Result<Option<String>>;

    /// Returns the current resolution id.
    fn resolution(&self, item: &ItemRef) -> Result<Option<String>>;

    /// Returns the value of a field.
    fn field_value(&self, item: &ItemRef, field: &str) -> Result<Option<FieldValue>>;

    /// Sets the value of a field on the working copy.
    fn set_field_value(&self, item: &ItemRef, field: &str, value: FieldValue) -> Result<()>;

    /// Returns the enumeration option of `field` for `option_id`.
    fn enumeration_option(&self, item: &ItemRef, field: &str, option_id: &str) -> Result<FieldValue>;

    /// Sets an enumerated field (including the built-in resolution) by option id.
    fn set_enumeration_value(&self, item: &ItemRef, field: &str, option_id: &str) -> Result<()>;

    /// Returns the linked revisions, oldest first.
    fn linked_revisions(&self, item: &ItemRef) -> Result<Vec<Revision>>;

    /// Returns the workflow transitions currently available.
    fn available_transitions(&self, item: &ItemRef) -> Result<Vec<WorkflowTransition>>;

    /// Performs a transition by its internal action id.
    fn perform_transition(&self, item: &ItemRef, action_id: &str) -> Result<()>;

    /// Persists the working copy.
    fn save(&self, item: &ItemRef) -> Result<()>;
}

/// Resolves user ids to display names.
pub trait UserDirectory: Send + Sync {
    /// Returns the display name, or `None` if the user cannot be resolved.
    fn display_name(&self, user: &UserId) -> Option<String>;
}

/// Identity and role membership of the calling user.
pub trait SecurityProvider: Send + Sync {
    /// Returns the current user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// Returns the roles `user` holds within `scope`.
    fn roles_for_user(&self, user: &UserId, scope: &ProjectId) -> Result<BTreeSet<String>>;
}

/// Runs a unit of work atomically.
pub trait TransactionRunner: Send + Sync {
    /// Executes `work`; its effects are committed only if it returns `Ok`.
    fn execute(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}

/// Reads content from the versioned repository.
pub trait RepositoryReader: Send + Sync {
    /// Returns the bytes stored at `location`.
    fn read(&self, location: &Location) -> Result<Vec<u8>>;
}

/// Resolves the repository root of a project scope.
pub trait ScopeLocator: Send + Sync {
    /// Returns the root location of `scope`.
    fn scope_root(&self, scope: &ProjectId) -> Result<Location>;
}

/// Elevation capability: runs an action under the system identity.
pub trait SystemAccess: Send + Sync {
    /// Runs `action` as the system user, independent of the caller's rights.
    fn run_as_system(&self, action: &mut dyn FnMut() -> Result<Vec<u8>>) -> Result<Vec<u8>>;
}

/// Dependencies of [`ReviewParameters`](crate::ReviewParameters).
#[derive(Clone)]
pub struct ReviewContext {
    /// Tracked item access.
    pub items: Arc<dyn ItemStore>,
    /// User name resolution.
    pub users: Arc<dyn UserDirectory>,
    /// Current user and roles.
    pub security: Arc<dyn SecurityProvider>,
    /// Atomic units of work.
    pub transactions: Arc<dyn TransactionRunner>,
}

impl ReviewContext {
    /// Creates a context from its collaborators.
    pub fn new(
        items: Arc<dyn ItemStore>,
        users: Arc<dyn UserDirectory>,
        security: Arc<dyn SecurityProvider>,
        transactions: Arc<dyn TransactionRunner>,
    ) -> Self {
        Self {
            items,
            users,
            security,
            transactions,
        }
    }
}

impl fmt::Debug for ReviewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_append() {
        let root = Location::new("/elibrary/");
        assert_eq!(
            root.append("/.polarion/codereview/codereview.properties").as_str(),
            "/elibrary/.polarion/codereview/codereview.properties"
        );
        assert_eq!(Location::new("/p").append("a").to_string(), "/p/a");
    }
}
