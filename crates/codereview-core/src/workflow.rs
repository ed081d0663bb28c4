//! Updating the review subject and applying workflow actions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use codereview_models::{FieldValue, RESOLUTION_FIELD};
use tracing::{debug, info};

use crate::error::{Result, ReviewError};
use crate::parameters::{ReviewParameters, WorkflowActionTag};

/// Review state of a subject, derived from its status and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewState {
    /// Not in the in-review status and unresolved.
    NotInReview,
    /// In the in-review status, or no in-review status is configured.
    InReview,
    /// Out of review with a resolution set.
    Resolved,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReviewState::NotInReview => "not in review",
            ReviewState::InReview => "in review",
            ReviewState::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Applies a workflow action to the subject of a review.
pub trait WorkflowActionHandler: Send + Sync {
    /// Tag this handler is registered for.
    fn tag(&self) -> WorkflowActionTag;

    /// Applies the action. Runs inside the caller's unit of work when called
    /// from [`ReviewParameters::store_work_item`].
    fn apply(&self, parameters: &ReviewParameters) -> Result<()>;
}

/// Performs the native transition configured in
/// `successfulReviewWorkflowAction`.
///
/// Sets `successfulReviewResolution` first when the transition requires a
/// resolution. Does nothing if no available transition matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuccessfulReviewHandler;

impl WorkflowActionHandler for SuccessfulReviewHandler {
    fn tag(&self) -> WorkflowActionTag {
        WorkflowActionTag::SuccessfulReview
    }

    fn apply(&self, parameters: &ReviewParameters) -> Result<()> {
        let configuration = parameters.configuration();
        let native_action = configuration
            .successful_review_workflow_action()
            .ok_or(ReviewError::WorkflowActionNotConfigured)?;
        let items = &parameters.context().items;
        let subject = parameters.subject();

        let Some(transition) = items
            .available_transitions(subject)?
            .into_iter()
            .find(|t| t.native_action_id == native_action)
        else {
            debug!(%subject, native_action, "no matching transition available");
            return Ok(());
        };

        if let Some(resolution) = configuration.successful_review_resolution() {
            if transition.required_features.iter().any(|f| f == RESOLUTION_FIELD) {
                items.set_enumeration_value(subject, RESOLUTION_FIELD, resolution)?;
            }
        }

        items.perform_transition(subject, &transition.action_id)?;
        info!(
            %subject,
            action = %transition.action_id,
            to = %transition.to,
            "performed workflow transition"
        );
        Ok(())
    }
}

/// Maps workflow action tags to their handlers.
pub struct WorkflowActionRegistry {
    handlers: HashMap<WorkflowActionTag, Arc<dyn WorkflowActionHandler>>,
}

impl WorkflowActionRegistry {
    /// Creates a registry with all built-in handlers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SuccessfulReviewHandler));
        registry
    }

    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler, replacing any handler for the same tag.
    pub fn register(&mut self, handler: Arc<dyn WorkflowActionHandler>) {
        self.handlers.insert(handler.tag(), handler);
    }

    /// Gets the handler for `tag`.
    pub fn get(&self, tag: WorkflowActionTag) -> Option<Arc<dyn WorkflowActionHandler>> {
        self.handlers.get(&tag).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for WorkflowActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkflowActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl ReviewParameters {
    /// Returns the review state of the subject.
    pub fn review_state(&self) -> Result<ReviewState> {
        if self.is_in_review_status()? {
            return Ok(ReviewState::InReview);
        }
        match self.context.items.resolution(&self.subject)? {
            Some(resolution) if !resolution.is_empty() => Ok(ReviewState::Resolved),
            _ => Ok(ReviewState::NotInReview),
        }
    }

    /// Writes review results to the subject without saving it.
    ///
    /// `new_reviewed_revisions` goes to `reviewedRevisionsField`,
    /// `new_reviewer` is resolved to an option of `reviewerField`. When
    /// `permitted_to_perform_action` is set, the requested workflow action
    /// runs last.
    pub fn update_work_item(
        &self,
        new_reviewed_revisions: Option<&str>,
        new_reviewer: Option<&str>,
        permitted_to_perform_action: bool,
    ) -> Result<&Self> {
        let items = &self.context.items;

        if let Some(reviewed) = new_reviewed_revisions {
            let field = self
                .configuration
                .reviewed_revisions_field()
                .ok_or(ReviewError::FieldNotConfigured {
                    key: crate::config::CONFIG_REVIEWED_REVISIONS_FIELD,
                })?;
            items.set_field_value(&self.subject, field, FieldValue::text(reviewed))?;
        }

        if let Some(reviewer) = new_reviewer {
            let field = self
                .configuration
                .reviewer_field()
                .ok_or(ReviewError::FieldNotConfigured {
                    key: crate::config::CONFIG_REVIEWER_FIELD,
                })?;
            let option = items.enumeration_option(&self.subject, field, reviewer)?;
            items.set_field_value(&self.subject, field, option)?;
        }

        if permitted_to_perform_action {
            if let Some(tag) = self.workflow_action() {
                let handler = self
                    .actions
                    .get(tag)
                    .ok_or_else(|| ReviewError::NoWorkflowActionHandler(tag.to_string()))?;
                handler.apply(self)?;
            }
        }

        Ok(self)
    }

    /// Like [`update_work_item`](Self::update_work_item), then saves the
    /// subject. Everything runs in one unit of work.
    pub fn store_work_item(
        &self,
        new_reviewed_revisions: Option<&str>,
        new_reviewer: Option<&str>,
        permitted_to_perform_action: bool,
    ) -> Result<&Self> {
        self.context.transactions.execute(&mut || {
            self.update_work_item(new_reviewed_revisions, new_reviewer, permitted_to_perform_action)?;
            self.context.items.save(&self.subject)
        })?;
        debug!(subject = %self.subject, "stored review results");
        Ok(self)
    }
}
