//! Tracker store for tracked items, their history, schema and users.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use codereview_models::{ItemRevision, ProjectId, TrackedItem, TrackerSchema, UserId, WorkItemId};
use tracing::{debug, warn};

use crate::atomic::{atomic_write_json, read_json, read_json_optional};
use crate::error::{PersistenceError, Result};

/// Manages persistence of tracked items.
///
/// Every save bumps the item's store revision and appends the full item
/// state to its history, so status changes can be reconstructed later:
/// ```text
/// base_path/
/// └── tracker/
///     ├── users.json
///     └── {project_id}/
///         ├── schema.json
///         ├── items/
///         │   └── {item_id}.json
///         └── history/
///             └── {item_id}/
///                 ├── 1.json
///                 └── 2.json
/// ```
pub struct TrackerStore {
    base_path: PathBuf,
}

impl TrackerStore {
    /// Creates a new TrackerStore with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn tracker_dir(&self) -> PathBuf {
        self.base_path.join("tracker")
    }

    fn project_dir(&self, project_id: &ProjectId) -> Result<PathBuf> {
        Ok(self
            .tracker_dir()
            .join(checked_id("project", project_id.as_str())?))
    }

    fn item_path(&self, project_id: &ProjectId, item_id: &WorkItemId) -> Result<PathBuf> {
        let file = format!("{}.json", checked_id("work item", item_id.as_str())?);
        Ok(self.project_dir(project_id)?.join("items").join(file))
    }

    fn history_dir(&self, project_id: &ProjectId, item_id: &WorkItemId) -> Result<PathBuf> {
        Ok(self
            .project_dir(project_id)?
            .join("history")
            .join(checked_id("work item", item_id.as_str())?))
    }

    fn history_path(
        &self,
        project_id: &ProjectId,
        item_id: &WorkItemId,
        revision: u64,
    ) -> Result<PathBuf> {
        Ok(self
            .history_dir(project_id, item_id)?
            .join(format!("{}.json", revision)))
    }

    fn schema_path(&self, project_id: &ProjectId) -> Result<PathBuf> {
        Ok(self.project_dir(project_id)?.join("schema.json"))
    }

    fn users_path(&self) -> PathBuf {
        self.tracker_dir().join("users.json")
    }

    /// Saves an item, recording a new history revision.
    ///
    /// On success the item's `revision`, `updated_at` and `updated_by` are
    /// updated in place; on failure the item is left untouched. The item file
    /// is written first and put back if its history record cannot be written.
    pub fn save_item(&self, item: &mut TrackedItem, author: Option<&UserId>) -> Result<()> {
        let item_path = self.item_path(&item.project_id, &item.id)?;

        let mut next = item.clone();
        next.revision += 1;
        next.updated_at = Some(Utc::now());
        next.updated_by = author.cloned();
        let history_path = self.history_path(&next.project_id, &next.id, next.revision)?;

        let record = ItemRevision {
            revision: next.revision,
            date: next.updated_at.unwrap_or_else(Utc::now),
            author: next.updated_by.clone(),
            item: next.clone(),
        };

        atomic_write_json(&item_path, &next)?;
        if let Err(e) = atomic_write_json(&history_path, &record) {
            if let Err(revert) = self.revert_item(&next.project_id, &next.id, next.revision) {
                warn!(item = %next.item_ref(), error = %revert, "failed to put back item after history write");
            }
            return Err(e);
        }

        *item = next;
        debug!(item = %item.item_ref(), revision = item.revision, "saved tracked item");
        Ok(())
    }

    /// Undoes the save that produced `revision`.
    ///
    /// The item file goes back to the state recorded for the previous
    /// revision (or is removed if there is none) and the history record of
    /// `revision` is deleted.
    pub fn revert_item(&self, project_id: &ProjectId, item_id: &WorkItemId, revision: u64) -> Result<()> {
        let item_path = self.item_path(project_id, item_id)?;
        if revision > 1 {
            let previous: ItemRevision =
                read_json(&self.history_path(project_id, item_id, revision - 1)?)?;
            atomic_write_json(&item_path, &previous.item)?;
        } else {
            remove_if_exists(&item_path)?;
        }
        remove_if_exists(&self.history_path(project_id, item_id, revision)?)?;

        debug!(project = %project_id, item = %item_id, revision, "reverted tracked item");
        Ok(())
    }

    /// Loads an item by ID.
    pub fn load_item(&self, project_id: &ProjectId, item_id: &WorkItemId) -> Result<TrackedItem> {
        let path = self.item_path(project_id, item_id)?;
        if !path.exists() {
            return Err(PersistenceError::NotFound {
                kind: "work item",
                id: format!("{}/{}", project_id, item_id),
            });
        }
        read_json(&path)
    }

    /// Lists all items of a project, sorted by ID.
    pub fn list_items(&self, project_id: &ProjectId) -> Result<Vec<TrackedItem>> {
        let dir = self.project_dir(project_id)?.join("items");
        let mut items: Vec<TrackedItem> = read_json_dir(&dir)?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Returns the stored revisions of an item, oldest first.
    pub fn history(&self, project_id: &ProjectId, item_id: &WorkItemId) -> Result<Vec<ItemRevision>> {
        let dir = self.history_dir(project_id, item_id)?;
        let mut records: Vec<ItemRevision> = read_json_dir(&dir)?;
        records.sort_by_key(|r| r.revision);
        Ok(records)
    }

    /// Loads the tracker schema of a project; missing schema means empty.
    pub fn load_schema(&self, project_id: &ProjectId) -> Result<TrackerSchema> {
        Ok(read_json_optional(&self.schema_path(project_id)?)?.unwrap_or_default())
    }

    /// Saves the tracker schema of a project.
    pub fn save_schema(&self, project_id: &ProjectId, schema: &TrackerSchema) -> Result<()> {
        atomic_write_json(&self.schema_path(project_id)?, schema)
    }

    /// Loads the user directory (user id to display name).
    pub fn load_users(&self) -> Result<BTreeMap<UserId, String>> {
        Ok(read_json_optional(&self.users_path())?.unwrap_or_default())
    }

    /// Saves the user directory.
    pub fn save_users(&self, users: &BTreeMap<UserId, String>) -> Result<()> {
        atomic_write_json(&self.users_path(), users)
    }
}

/// Rejects ids that are empty or could step outside their directory.
fn checked_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    if id.is_empty() || id == "." || id.contains("..") || id.contains(['/', '\\']) {
        return Err(PersistenceError::InvalidLocation(format!("{} id '{}'", kind, id)));
    }
    Ok(id)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PersistenceError::WriteError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads every `*.json` document in `dir`, skipping unreadable ones.
fn read_json_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| PersistenceError::ReadError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PersistenceError::ReadError {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            match read_json::<T>(&path) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
    }
    Ok(documents)
}
