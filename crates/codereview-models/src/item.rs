//! Tracked items under review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::field::FieldValue;
use crate::ids::{ProjectId, UserId, WorkItemId};
use crate::revision::Revision;

/// Name of the built-in resolution field (also used as a workflow feature key).
pub const RESOLUTION_FIELD: &str = "resolution";

/// Reference to a tracked item within its project scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Scope the item lives in.
    pub project_id: ProjectId,
    /// Item identifier, unique within the project.
    pub id: WorkItemId,
}

impl ItemRef {
    /// Creates a new item reference.
    pub fn new(project_id: impl Into<ProjectId>, id: impl Into<WorkItemId>) -> Self {
        Self {
            project_id: project_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.id)
    }
}

/// A tracked item (work item) as persisted by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Unique identifier within the project.
    pub id: WorkItemId,

    /// Project this item belongs to.
    pub project_id: ProjectId,

    /// Short title.
    #[serde(default)]
    pub title: String,

    /// Current status id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Current resolution id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    /// Custom field values by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    /// Revisions linked to this item, oldest first.
    #[serde(default)]
    pub linked_revisions: Vec<Revision>,

    /// Store revision of the last save (0 = never saved).
    #[serde(default)]
    pub revision: u64,

    /// When the item was last saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Who saved the item last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
}

impl TrackedItem {
    /// Creates a new, never saved item.
    pub fn new(
        project_id: impl Into<ProjectId>,
        id: impl Into<WorkItemId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            title: title.into(),
            status: None,
            resolution: None,
            fields: BTreeMap::new(),
            linked_revisions: Vec::new(),
            revision: 0,
            updated_at: None,
            updated_by: None,
        }
    }

    /// Returns the reference for this item.
    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            project_id: self.project_id.clone(),
            id: self.id.clone(),
        }
    }

    /// Sets the status, returning self for chaining.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets a field value, returning self for chaining.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Links a revision, returning self for chaining.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.link_revision(revision);
        self
    }

    /// Links a revision unless it is already linked.
    pub fn link_revision(&mut self, revision: Revision) {
        if !self.linked_revisions.iter().any(|r| r.name == revision.name) {
            self.linked_revisions.push(revision);
        }
    }

    /// Returns the value of a custom field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
