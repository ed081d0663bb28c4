//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use codereview_models::{
    EnumOption, FieldValue, ItemRef, ProjectId, Revision, UserId, WorkflowTransition,
};

use crate::config::ReviewConfiguration;
use crate::context::{
    ItemStore, ReviewContext, SecurityProvider, TransactionRunner, UserDirectory,
};
use crate::error::{Result, ReviewError};
use crate::loader::ConfigurationLoader;
use crate::parameters::{ReviewParameters, ReviewRequest};

pub(crate) const PATTERN_ONLY: &str = "fastTrackPermittedLocationPattern=/trunk/.*\n";

#[derive(Debug, Default)]
pub(crate) struct ItemState {
    pub status: Option<String>,
    pub resolution: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub revisions: Vec<Revision>,
    pub transitions: Vec<WorkflowTransition>,
    pub options: BTreeMap<String, Vec<EnumOption>>,
    pub performed: Vec<String>,
    pub saves: usize,
    pub fail_save: bool,
}

/// A single item; every [`ItemRef`] resolves to it.
#[derive(Default)]
pub(crate) struct MemoryItems {
    pub state: Mutex<ItemState>,
}

impl MemoryItems {
    pub fn with_status(status: &str) -> Self {
        let items = Self::default();
        items.state.lock().unwrap().status = Some(status.to_string());
        items
    }

    pub fn update(&self, f: impl FnOnce(&mut ItemState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn read<T>(&self, f: impl FnOnce(&ItemState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }
}

impl ItemStore for MemoryItems {
    fn status(&self, _item: &ItemRef) -> Result<Option<String>> {
        Ok(self.read(|s| s.status.clone()))
    }

    fn resolution(&self, _item: &ItemRef) -> Result<Option<String>> {
        Ok(self.read(|s| s.resolution.clone()))
    }

    fn field_value(&self, _item: &ItemRef, field: &str) -> Result<Option<FieldValue>> {
        Ok(self.read(|s| s.fields.get(field).cloned()))
    }

    fn set_field_value(&self, _item: &ItemRef, field: &str, value: FieldValue) -> Result<()> {
        self.update(|s| {
            if field == codereview_models::RESOLUTION_FIELD {
                s.resolution = Some(value.as_text());
            } else {
                s.fields.insert(field.to_string(), value);
            }
        });
        Ok(())
    }

    fn enumeration_option(&self, _item: &ItemRef, field: &str, option_id: &str) -> Result<FieldValue> {
        let option = self.read(|s| {
            s.options
                .get(field)
                .and_then(|options| options.iter().find(|o| o.id == option_id).cloned())
        });
        Ok(FieldValue::Option(
            option.unwrap_or_else(|| EnumOption::phantom(option_id)),
        ))
    }

    fn set_enumeration_value(&self, item: &ItemRef, field: &str, option_id: &str) -> Result<()> {
        let value = self.enumeration_option(item, field, option_id)?;
        self.set_field_value(item, field, value)
    }

    fn linked_revisions(&self, _item: &ItemRef) -> Result<Vec<Revision>> {
        Ok(self.read(|s| s.revisions.clone()))
    }

    fn available_transitions(&self, _item: &ItemRef) -> Result<Vec<WorkflowTransition>> {
        Ok(self.read(|s| {
            s.transitions
                .iter()
                .filter(|t| t.is_available_from(s.status.as_deref()))
                .cloned()
                .collect()
        }))
    }

    fn perform_transition(&self, _item: &ItemRef, action_id: &str) -> Result<()> {
        self.update(|s| {
            if let Some(target) = s
                .transitions
                .iter()
                .find(|t| t.action_id == action_id)
                .map(|t| t.to.clone())
            {
                s.status = Some(target);
            }
            s.performed.push(action_id.to_string());
        });
        Ok(())
    }

    fn save(&self, _item: &ItemRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_save {
            return Err(ReviewError::ItemStore("save rejected".to_string()));
        }
        state.saves += 1;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemorySecurity {
    pub current: Option<UserId>,
    pub roles: BTreeMap<UserId, BTreeSet<String>>,
}

impl MemorySecurity {
    pub fn as_user(user: &str) -> Self {
        Self {
            current: Some(UserId::from(user)),
            roles: BTreeMap::new(),
        }
    }

    pub fn grant(mut self, user: &str, role: &str) -> Self {
        self.roles
            .entry(UserId::from(user))
            .or_default()
            .insert(role.to_string());
        self
    }
}

impl SecurityProvider for MemorySecurity {
    fn current_user(&self) -> Option<UserId> {
        self.current.clone()
    }

    fn roles_for_user(&self, user: &UserId, _scope: &ProjectId) -> Result<BTreeSet<String>> {
        Ok(self.roles.get(user).cloned().unwrap_or_default())
    }
}

pub(crate) struct MemoryUsers(pub BTreeMap<UserId, String>);

impl UserDirectory for MemoryUsers {
    fn display_name(&self, user: &UserId) -> Option<String> {
        self.0.get(user).cloned()
    }
}

/// Runs the work directly; rollback is the work's own concern.
pub(crate) struct DirectTransactions;

impl TransactionRunner for DirectTransactions {
    fn execute(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        work()
    }
}

pub(crate) struct FixedLoader(pub Arc<ReviewConfiguration>);

impl ConfigurationLoader for FixedLoader {
    fn load(&self, _scope: &ProjectId) -> Result<Arc<ReviewConfiguration>> {
        Ok(self.0.clone())
    }
}

pub(crate) fn subject() -> ItemRef {
    ItemRef::new("elibrary", "EL-1")
}

pub(crate) fn context(items: Arc<MemoryItems>, security: MemorySecurity) -> ReviewContext {
    let users = [("alice", "Alice Adams"), ("bob", "Bob Brown")]
        .into_iter()
        .map(|(id, name)| (UserId::from(id), name.to_string()))
        .collect();
    ReviewContext::new(
        items,
        Arc::new(MemoryUsers(users)),
        Arc::new(security),
        Arc::new(DirectTransactions),
    )
}

/// Builds parameters for [`subject`] with the given configuration text.
pub(crate) fn parameters_for(
    config: &str,
    items: Arc<MemoryItems>,
    security: MemorySecurity,
    request: impl FnOnce(&mut ReviewRequest),
) -> ReviewParameters {
    let configuration = ReviewConfiguration::parse(config).unwrap();
    let mut review_request = ReviewRequest::new(subject());
    request(&mut review_request);
    ReviewParameters::from_request(
        context(items, security),
        review_request,
        &FixedLoader(Arc::new(configuration)),
    )
    .unwrap()
}
