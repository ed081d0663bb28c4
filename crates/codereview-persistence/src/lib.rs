//! Persistence layer for the code review engine.
//!
//! This crate provides crash-safe, file-backed stores using atomic file
//! operations (write to temp file, then rename):
//!
//! - [`TrackerStore`]: tracked items, their revision history, the per-project
//!   tracker schema and the user directory.
//! - [`RepositoryStore`]: a versioned file tree that project configuration is
//!   read from.
//!
//! # Example
//!
//! ```no_run
//! use codereview_persistence::TrackerStore;
//! use codereview_models::TrackedItem;
//!
//! let store = TrackerStore::new("/tmp/codereview");
//!
//! let mut item = TrackedItem::new("elibrary", "EL-1", "Review parser");
//! store.save_item(&mut item, None).unwrap();
//!
//! let loaded = store.load_item(&item.project_id, &item.id).unwrap();
//! assert_eq!(loaded.revision, 1);
//! ```

pub mod atomic;
pub mod error;
pub mod repository_store;
pub mod tracker_store;

pub use error::{PersistenceError, Result};
pub use repository_store::RepositoryStore;
pub use tracker_store::TrackerStore;
