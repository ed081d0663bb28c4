//! File-backed collaborators.
//!
//! [`TrackerItems`] serves tracked items from a [`TrackerStore`] through
//! in-memory working copies. Saves made inside a unit of work are staged and
//! written when the work succeeds; on failure the working copies are rolled
//! back. [`RepositoryStore`] serves configuration content and scope roots,
//! and [`StaticSecurity`] serves users and roles from a JSON document.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use codereview_models::{
    FieldValue, ItemRef, ProjectId, Revision, TrackedItem, TrackerSchema, UserId,
    WorkflowTransition, RESOLUTION_FIELD,
};
use codereview_persistence::atomic::read_json_optional;
use codereview_persistence::{RepositoryStore, TrackerStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::{
    ItemStore, Location, RepositoryReader, ScopeLocator, SecurityProvider, SystemAccess,
    TransactionRunner, UserDirectory,
};
use crate::error::{Result, ReviewError};
use crate::history::StatusHistory;

#[derive(Default)]
struct WorkingState {
    items: HashMap<ItemRef, TrackedItem>,
    schemas: HashMap<ProjectId, TrackerSchema>,
    unit: Option<UnitOfWork>,
}

struct UnitOfWork {
    rollback: HashMap<ItemRef, TrackedItem>,
    staged: Vec<ItemRef>,
}

impl UnitOfWork {
    fn stage(&mut self, item: &ItemRef) {
        if !self.staged.contains(item) {
            self.staged.push(item.clone());
        }
    }
}

/// Item store over a [`TrackerStore`].
pub struct TrackerItems {
    store: TrackerStore,
    author: Option<UserId>,
    state: Mutex<WorkingState>,
}

impl TrackerItems {
    /// Creates an item store. Saves are attributed to `author`.
    pub fn new(store: TrackerStore, author: Option<UserId>) -> Self {
        Self {
            store,
            author,
            state: Mutex::new(WorkingState::default()),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &TrackerStore {
        &self.store
    }

    /// Reconstructs the status history of `item` from its stored revisions.
    pub fn history(&self, item: &ItemRef) -> Result<StatusHistory> {
        let revisions = self.store.history(&item.project_id, &item.id)?;
        Ok(StatusHistory::from_revisions(&revisions))
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorkingState>> {
        self.state
            .lock()
            .map_err(|e| ReviewError::LockPoisoned(e.to_string()))
    }

    /// Runs `f` on the working copy of `item`, loading it on first use.
    fn with_item<T>(
        &self,
        item: &ItemRef,
        f: impl FnOnce(&mut TrackedItem, &TrackerSchema) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        if !state.schemas.contains_key(&item.project_id) {
            let schema = self.store.load_schema(&item.project_id)?;
            state.schemas.insert(item.project_id.clone(), schema);
        }
        if !state.items.contains_key(item) {
            let loaded = self.store.load_item(&item.project_id, &item.id)?;
            state.items.insert(item.clone(), loaded);
        }

        match (state.items.get_mut(item), state.schemas.get(&item.project_id)) {
            (Some(working), Some(schema)) => f(working, schema),
            _ => Err(ReviewError::ItemStore(format!("{} is not loaded", item))),
        }
    }

    fn write(&self, item: &mut TrackedItem) -> Result<()> {
        self.store.save_item(item, self.author.as_ref())?;
        Ok(())
    }
}

impl ItemStore for TrackerItems {
    fn status(&self, item: &ItemRef) -> Result<Option<String>> {
        self.with_item(item, |working, _| Ok(working.status.clone()))
    }

    fn resolution(&self, item: &ItemRef) -> Result<Option<String>> {
        self.with_item(item, |working, _| Ok(working.resolution.clone()))
    }

    fn field_value(&self, item: &ItemRef, field: &str) -> Result<Option<FieldValue>> {
        self.with_item(item, |working, _| {
            if field == RESOLUTION_FIELD {
                return Ok(working.resolution.clone().map(FieldValue::Text));
            }
            Ok(working.field(field).cloned())
        })
    }

    fn set_field_value(&self, item: &ItemRef, field: &str, value: FieldValue) -> Result<()> {
        self.with_item(item, |working, _| {
            if field == RESOLUTION_FIELD {
                working.resolution = Some(value.as_text());
            } else {
                working.fields.insert(field.to_string(), value);
            }
            Ok(())
        })
    }

    fn enumeration_option(&self, item: &ItemRef, field: &str, option_id: &str) -> Result<FieldValue> {
        self.with_item(item, |_, schema| {
            Ok(FieldValue::Option(schema.option(field, option_id)))
        })
    }

    fn set_enumeration_value(&self, item: &ItemRef, field: &str, option_id: &str) -> Result<()> {
        let value = self.enumeration_option(item, field, option_id)?;
        self.set_field_value(item, field, value)
    }

    fn linked_revisions(&self, item: &ItemRef) -> Result<Vec<Revision>> {
        self.with_item(item, |working, _| Ok(working.linked_revisions.clone()))
    }

    fn available_transitions(&self, item: &ItemRef) -> Result<Vec<WorkflowTransition>> {
        self.with_item(item, |working, schema| {
            Ok(schema
                .available_transitions(working.status.as_deref())
                .into_iter()
                .cloned()
                .collect())
        })
    }

    fn perform_transition(&self, item: &ItemRef, action_id: &str) -> Result<()> {
        self.with_item(item, |working, schema| {
            let transition = schema
                .available_transitions(working.status.as_deref())
                .into_iter()
                .find(|t| t.action_id == action_id)
                .ok_or_else(|| {
                    ReviewError::ItemStore(format!(
                        "action {} is not available for {}",
                        action_id,
                        working.item_ref()
                    ))
                })?;
            info!(
                item = %working.item_ref(),
                action = %action_id,
                from = ?working.status,
                to = %transition.to,
                "transitioning item"
            );
            working.status = Some(transition.to.clone());
            Ok(())
        })
    }

    fn save(&self, item: &ItemRef) -> Result<()> {
        // Make sure the working copy exists before staging or writing it.
        self.with_item(item, |_, _| Ok(()))?;

        let mut state = self.lock()?;
        if let Some(unit) = state.unit.as_mut() {
            unit.stage(item);
            debug!(%item, "staged save");
            return Ok(());
        }
        let working = state
            .items
            .get_mut(item)
            .ok_or_else(|| ReviewError::ItemStore(format!("{} is not loaded", item)))?;
        self.write(working)
    }
}

impl TransactionRunner for TrackerItems {
    /// Runs `work` as one unit. Units of work do not nest.
    fn execute(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        {
            let mut state = self.lock()?;
            if state.unit.is_some() {
                return Err(ReviewError::ItemStore(
                    "a unit of work is already running".to_string(),
                ));
            }
            let rollback = state.items.clone();
            state.unit = Some(UnitOfWork {
                rollback,
                staged: Vec::new(),
            });
        }

        let outcome = work();

        let mut state = self.lock()?;
        let Some(unit) = state.unit.take() else {
            return Err(ReviewError::ItemStore("unit of work was lost".to_string()));
        };

        if let Err(e) = outcome {
            warn!(error = %e, "unit of work failed, rolling back");
            state.items = unit.rollback;
            return Err(e);
        }

        let mut committed: Vec<(&ItemRef, u64)> = Vec::new();
        for item in &unit.staged {
            let written = match state.items.get_mut(item) {
                Some(working) => self.write(working).map(|()| working.revision),
                None => Err(ReviewError::ItemStore(format!("{} is not loaded", item))),
            };
            match written {
                Ok(revision) => committed.push((item, revision)),
                Err(e) => {
                    warn!(%item, error = %e, "commit failed, rolling back");
                    for (done, revision) in committed {
                        if let Err(revert) =
                            self.store.revert_item(&done.project_id, &done.id, revision)
                        {
                            warn!(item = %done, error = %revert, "failed to revert committed save");
                        }
                    }
                    state.items = unit.rollback;
                    return Err(e);
                }
            }
        }
        debug!(saved = unit.staged.len(), "committed unit of work");
        Ok(())
    }
}

impl UserDirectory for TrackerItems {
    fn display_name(&self, user: &UserId) -> Option<String> {
        match self.store.load_users() {
            Ok(users) => users.get(user).cloned(),
            Err(e) => {
                warn!(%user, error = %e, "failed to read user directory");
                None
            }
        }
    }
}

impl RepositoryReader for RepositoryStore {
    fn read(&self, location: &Location) -> Result<Vec<u8>> {
        Ok(RepositoryStore::read(self, location.as_str())?)
    }
}

impl ScopeLocator for RepositoryStore {
    fn scope_root(&self, scope: &ProjectId) -> Result<Location> {
        Ok(Location::new(self.project_location(scope)))
    }
}

/// Role assignments as stored on disk: project, then user, then roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignments {
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, BTreeMap<UserId, BTreeSet<String>>>,
}

/// Security provider with a fixed current user and role assignments.
#[derive(Debug, Clone, Default)]
pub struct StaticSecurity {
    current: Option<UserId>,
    assignments: RoleAssignments,
}

impl StaticSecurity {
    pub fn new(current: Option<UserId>, assignments: RoleAssignments) -> Self {
        Self {
            current,
            assignments,
        }
    }

    /// Loads role assignments from `path`; a missing file means no roles.
    pub fn load(path: &Path, current: Option<UserId>) -> Result<Self> {
        let assignments = read_json_optional(path)?.unwrap_or_default();
        Ok(Self::new(current, assignments))
    }

    pub fn assignments(&self) -> &RoleAssignments {
        &self.assignments
    }
}

impl SecurityProvider for StaticSecurity {
    fn current_user(&self) -> Option<UserId> {
        self.current.clone()
    }

    fn roles_for_user(&self, user: &UserId, scope: &ProjectId) -> Result<BTreeSet<String>> {
        Ok(self
            .assignments
            .projects
            .get(scope)
            .and_then(|users| users.get(user))
            .cloned()
            .unwrap_or_default())
    }
}

/// The file-backed stores carry no access control, so elevation only marks
/// the boundary in the log and runs `action` as is.
impl SystemAccess for StaticSecurity {
    fn run_as_system(&self, action: &mut dyn FnMut() -> Result<Vec<u8>>) -> Result<Vec<u8>> {
        debug!(user = ?self.current, "running as system");
        action()
    }
}
