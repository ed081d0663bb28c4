//! Per-request review parameters.
//!
//! [`ReviewParameters`] binds one review subject, the request flags and the
//! subject's project configuration together. Read operations live in
//! [`authorization`](crate::authorization) and [`revisions`](crate::revisions);
//! writes live in [`workflow`](crate::workflow).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use codereview_models::ItemRef;
use tracing::debug;

use crate::config::{parse_bool, ReviewConfiguration};
use crate::context::ReviewContext;
use crate::error::{Result, ReviewError};
use crate::link::ReviewLink;
use crate::loader::ConfigurationLoader;
use crate::workflow::WorkflowActionRegistry;

// Request parameter names
pub const PARAM_WORK_ITEM_ID: &str = "id";
pub const PARAM_PROJECT_ID: &str = "projectId";
pub const PARAM_AGGREGATED_COMPARE: &str = "aggregated";
pub const PARAM_COMPARE_ALL: &str = "compareAll";
pub const PARAM_WORKFLOW_ACTION: &str = "workflowAction";

/// Workflow action requested together with a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowActionTag {
    /// The review succeeded; take the configured transition.
    SuccessfulReview,
}

impl WorkflowActionTag {
    /// All tags.
    pub const ALL: [WorkflowActionTag; 1] = [WorkflowActionTag::SuccessfulReview];

    /// Returns the tag as used in request parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowActionTag::SuccessfulReview => "successfulReview",
        }
    }
}

impl fmt::Display for WorkflowActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowActionTag {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ReviewError::UnknownWorkflowAction(s.to_string()))
    }
}

/// Request-derived inputs of a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Item under review.
    pub subject: ItemRef,
    /// Compare all pending revisions as one aggregated diff.
    pub aggregated_compare: bool,
    /// Present every linked revision, ignoring review progress.
    pub compare_all: bool,
    /// Action to take when the review is stored.
    pub workflow_action: Option<WorkflowActionTag>,
}

impl ReviewRequest {
    /// Creates a request without flags or workflow action.
    pub fn new(subject: ItemRef) -> Self {
        Self {
            subject,
            aggregated_compare: false,
            compare_all: false,
            workflow_action: None,
        }
    }

    /// Builds a request from decoded query pairs. The first occurrence of a
    /// parameter wins.
    pub fn from_query_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut id = None;
        let mut project_id = None;
        let mut aggregated = None;
        let mut compare_all = None;
        let mut workflow_action = None;

        for (key, value) in pairs {
            let slot = match key.as_ref() {
                PARAM_WORK_ITEM_ID => &mut id,
                PARAM_PROJECT_ID => &mut project_id,
                PARAM_AGGREGATED_COMPARE => &mut aggregated,
                PARAM_COMPARE_ALL => &mut compare_all,
                PARAM_WORKFLOW_ACTION => &mut workflow_action,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.as_ref().to_string());
            }
        }

        let id = id.ok_or(ReviewError::MissingParameter(PARAM_WORK_ITEM_ID))?;
        let project_id = project_id.ok_or(ReviewError::MissingParameter(PARAM_PROJECT_ID))?;
        let workflow_action = workflow_action
            .map(|action| action.parse::<WorkflowActionTag>())
            .transpose()?;

        Ok(Self {
            subject: ItemRef::new(project_id, id),
            aggregated_compare: parse_bool(aggregated.as_deref()),
            compare_all: parse_bool(compare_all.as_deref()),
            workflow_action,
        })
    }

    /// Builds a request from a URL query string.
    pub fn from_query(query: &str) -> Result<Self> {
        Self::from_query_pairs(url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
    }
}

/// Review subject, request flags and project configuration of one request.
pub struct ReviewParameters {
    pub(crate) context: ReviewContext,
    pub(crate) subject: ItemRef,
    aggregated_compare: bool,
    compare_all: bool,
    workflow_action: Option<WorkflowActionTag>,
    pub(crate) configuration: Arc<ReviewConfiguration>,
    pub(crate) actions: Arc<WorkflowActionRegistry>,
}

impl ReviewParameters {
    /// Creates parameters for `subject` without flags or workflow action.
    pub fn new(
        context: ReviewContext,
        subject: ItemRef,
        loader: &dyn ConfigurationLoader,
    ) -> Result<Self> {
        Self::from_request(context, ReviewRequest::new(subject), loader)
    }

    /// Creates parameters for a request, loading the subject's configuration.
    pub fn from_request(
        context: ReviewContext,
        request: ReviewRequest,
        loader: &dyn ConfigurationLoader,
    ) -> Result<Self> {
        let configuration = loader.load(&request.subject.project_id)?;

        debug!(
            subject = %request.subject,
            aggregated = request.aggregated_compare,
            compare_all = request.compare_all,
            workflow_action = ?request.workflow_action,
            "created review parameters"
        );

        Ok(Self {
            context,
            subject: request.subject,
            aggregated_compare: request.aggregated_compare,
            compare_all: request.compare_all,
            workflow_action: request.workflow_action,
            configuration,
            actions: Arc::new(WorkflowActionRegistry::new()),
        })
    }

    /// Replaces the workflow action handlers.
    pub fn with_actions(mut self, actions: Arc<WorkflowActionRegistry>) -> Self {
        self.actions = actions;
        self
    }

    /// Returns the item under review.
    pub fn subject(&self) -> &ItemRef {
        &self.subject
    }

    /// Returns the collaborators.
    pub fn context(&self) -> &ReviewContext {
        &self.context
    }

    /// Returns the project configuration.
    pub fn configuration(&self) -> &ReviewConfiguration {
        &self.configuration
    }

    pub fn is_aggregated_compare(&self) -> bool {
        self.aggregated_compare
    }

    pub fn is_compare_all(&self) -> bool {
        self.compare_all
    }

    pub fn workflow_action(&self) -> Option<WorkflowActionTag> {
        self.workflow_action
    }

    /// Returns true if a successful review can trigger a transition.
    pub fn is_workflow_action_configured(&self) -> bool {
        self.configuration.successful_review_workflow_action().is_some()
    }

    pub fn fast_track_reviewer(&self) -> Option<&str> {
        self.configuration.fast_track_reviewer()
    }

    pub fn unresolved_work_item_with_revisions_needs_time_point(&self) -> bool {
        self.configuration
            .unresolved_work_item_with_revisions_needs_time_point()
    }

    /// Returns a link back to this review, carrying the current flags.
    pub fn link(&self) -> ReviewLink {
        ReviewLink::new(self.subject.clone())
            .with_aggregated_compare(self.aggregated_compare)
            .with_compare_all(self.compare_all)
            .with_workflow_action(self.workflow_action)
    }
}

impl fmt::Debug for ReviewParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewParameters")
            .field("subject", &self.subject)
            .field("aggregated_compare", &self.aggregated_compare)
            .field("compare_all", &self.compare_all)
            .field("workflow_action", &self.workflow_action)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_action_tag_parse() {
        assert_eq!(
            "successfulReview".parse::<WorkflowActionTag>().unwrap(),
            WorkflowActionTag::SuccessfulReview
        );
        assert!(matches!(
            "SuccessfulReview".parse::<WorkflowActionTag>(),
            Err(ReviewError::UnknownWorkflowAction(_))
        ));
        assert_eq!(WorkflowActionTag::SuccessfulReview.to_string(), "successfulReview");
    }

    #[test]
    fn test_request_from_query() {
        let request = ReviewRequest::from_query(
            "?id=EL-1&projectId=elibrary&aggregated=TRUE&compareAll=yes&workflowAction=successfulReview",
        )
        .unwrap();

        assert_eq!(request.subject, ItemRef::new("elibrary", "EL-1"));
        assert!(request.aggregated_compare);
        assert!(!request.compare_all);
        assert_eq!(request.workflow_action, Some(WorkflowActionTag::SuccessfulReview));
    }

    #[test]
    fn test_request_defaults() {
        let request = ReviewRequest::from_query("id=EL-1&projectId=elibrary&other=x").unwrap();
        assert_eq!(request, ReviewRequest::new(ItemRef::new("elibrary", "EL-1")));
    }

    #[test]
    fn test_request_first_value_wins() {
        let request =
            ReviewRequest::from_query_pairs([("id", "EL-1"), ("projectId", "p"), ("id", "EL-2")])
                .unwrap();
        assert_eq!(request.subject.id.as_str(), "EL-1");
    }

    #[test]
    fn test_request_missing_parameters() {
        assert!(matches!(
            ReviewRequest::from_query("projectId=p"),
            Err(ReviewError::MissingParameter(PARAM_WORK_ITEM_ID))
        ));
        assert!(matches!(
            ReviewRequest::from_query("id=EL-1"),
            Err(ReviewError::MissingParameter(PARAM_PROJECT_ID))
        ));
    }

    #[test]
    fn test_request_unknown_workflow_action() {
        let result = ReviewRequest::from_query("id=EL-1&projectId=p&workflowAction=reject");
        assert!(matches!(result, Err(ReviewError::UnknownWorkflowAction(_))));
    }
}
