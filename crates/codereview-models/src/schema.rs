//! Per-project tracker schema: workflow transitions and enumerations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::field::EnumOption;

/// A workflow transition defined for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTransition {
    /// Internal action id used to perform the transition.
    pub action_id: String,

    /// Native action id, as referenced from review configuration.
    pub native_action_id: String,

    /// Statuses the transition is available from; empty means any status.
    #[serde(default)]
    pub from: Vec<String>,

    /// Status the item ends up in.
    pub to: String,

    /// Features (fields) that must be set before performing the transition.
    #[serde(default)]
    pub required_features: Vec<String>,
}

impl WorkflowTransition {
    /// Creates a transition available from any status.
    pub fn new(
        action_id: impl Into<String>,
        native_action_id: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            native_action_id: native_action_id.into(),
            from: Vec::new(),
            to: to.into(),
            required_features: Vec::new(),
        }
    }

    /// Restricts the statuses the transition is available from.
    pub fn from_statuses(mut self, statuses: &[&str]) -> Self {
        self.from = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Adds a required feature.
    pub fn requiring(mut self, feature: impl Into<String>) -> Self {
        self.required_features.push(feature.into());
        self
    }

    /// Returns true if the transition can be taken from `status`.
    pub fn is_available_from(&self, status: Option<&str>) -> bool {
        if self.from.is_empty() {
            return true;
        }
        status.is_some_and(|s| self.from.iter().any(|f| f == s))
    }
}

/// Schema of a project's tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSchema {
    /// Workflow transitions.
    #[serde(default)]
    pub transitions: Vec<WorkflowTransition>,

    /// Enumeration options per field name.
    #[serde(default)]
    pub enumerations: BTreeMap<String, Vec<EnumOption>>,
}

impl TrackerSchema {
    /// Returns the transitions available from `status`.
    pub fn available_transitions(&self, status: Option<&str>) -> Vec<&WorkflowTransition> {
        self.transitions
            .iter()
            .filter(|t| t.is_available_from(status))
            .collect()
    }

    /// Looks up an enumeration option of `field`.
    ///
    /// Options missing from the schema are returned as phantom options.
    pub fn option(&self, field: &str, id: &str) -> EnumOption {
        self.enumerations
            .get(field)
            .and_then(|options| options.iter().find(|o| o.id == id))
            .cloned()
            .unwrap_or_else(|| EnumOption::phantom(id))
    }
}
