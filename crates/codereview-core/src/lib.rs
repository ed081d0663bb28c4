//! Code review engine: review authorization and workflow transitions.
//!
//! For one review subject (a tracked item) the engine decides which linked
//! revisions are under review, who may review them now or retroactively,
//! and what happens when a review completes. It also reconstructs status
//! change events from an item's history.
//!
//! - **config** / **loader**: per-project configuration read from the
//!   versioned repository under the system identity, optionally cached
//! - **parameters**: the per-request [`ReviewParameters`] aggregate
//! - **authorization**: review eligibility and reviewer permissions
//! - **revisions**: the revisions presented for review
//! - **workflow**: field updates and workflow actions, atomically stored
//! - **history**: status change events from chronological snapshots
//! - **backends**: file-backed collaborators over `codereview-persistence`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use codereview_core::{
//!     caching, RepositoryConfigurationLoader, ReviewContext, ReviewParameters, ReviewRequest,
//!     StaticSecurity, TrackerItems,
//! };
//! use codereview_persistence::{RepositoryStore, TrackerStore};
//!
//! # fn main() -> codereview_core::Result<()> {
//! let security = Arc::new(StaticSecurity::default());
//! let repository = Arc::new(RepositoryStore::new("/tmp/codereview"));
//! let loader = caching(RepositoryConfigurationLoader::new(
//!     repository.clone(),
//!     repository,
//!     security.clone(),
//! ));
//! let items = Arc::new(TrackerItems::new(TrackerStore::new("/tmp/codereview"), None));
//! let context = ReviewContext::new(items.clone(), items.clone(), security, items);
//!
//! let request = ReviewRequest::from_query("id=EL-1&projectId=elibrary")?;
//! let params = ReviewParameters::from_request(context, request, &loader)?;
//! if params.can_review()? {
//!     let revisions = params.create_revisions()?;
//!     println!("{} revisions pending", revisions.pending().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod backends;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod identity;
pub mod link;
pub mod loader;
pub mod parameters;
pub mod properties;
pub mod revisions;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use backends::{RoleAssignments, StaticSecurity, TrackerItems};
pub use config::{ReviewConfiguration, CONFIG_PATH};
pub use context::{
    ItemStore, Location, RepositoryReader, ReviewContext, ScopeLocator, SecurityProvider,
    SystemAccess, TransactionRunner, UserDirectory,
};
pub use error::{Result, ReviewError};
pub use history::{ChangeEvent, HistoryEntry, StatusHistory};
pub use identity::ReviewerIdentity;
pub use link::{assemble_query, ReviewLink};
pub use loader::{caching, CachingConfigurationLoader, ConfigurationLoader, RepositoryConfigurationLoader};
pub use parameters::{ReviewParameters, ReviewRequest, WorkflowActionTag};
pub use properties::Properties;
pub use workflow::{
    ReviewState, SuccessfulReviewHandler, WorkflowActionHandler, WorkflowActionRegistry,
};
