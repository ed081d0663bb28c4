//! Historical views of tracked items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{UserId, WorkItemId};
use crate::item::TrackedItem;

/// Immutable view of a tracked item at a past revision.
///
/// Equality is structural: two snapshots of the same item at the same
/// revision with the same status are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    /// Item the snapshot was taken of.
    pub item_id: WorkItemId,
    /// Revision the snapshot represents.
    pub revision: String,
    /// Status id at that revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl HistoricalSnapshot {
    /// Creates a snapshot.
    pub fn new(
        item_id: impl Into<WorkItemId>,
        revision: impl Into<String>,
        status: Option<&str>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            revision: revision.into(),
            status: status.map(str::to_string),
        }
    }

    /// Returns the status id at this revision.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// A stored revision of a tracked item, as written to the item history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRevision {
    /// Store revision number.
    pub revision: u64,
    /// When the revision was written.
    pub date: DateTime<Utc>,
    /// Who wrote the revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserId>,
    /// Full item state at this revision.
    pub item: TrackedItem,
}

impl ItemRevision {
    /// Returns the snapshot view of this revision.
    pub fn snapshot(&self) -> HistoricalSnapshot {
        HistoricalSnapshot::new(
            self.item.id.clone(),
            self.revision.to_string(),
            self.item.status.as_deref(),
        )
    }
}
