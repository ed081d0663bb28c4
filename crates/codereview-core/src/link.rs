//! Deep links back into a review.

use std::fmt;

use codereview_models::ItemRef;

use crate::parameters::{
    WorkflowActionTag, PARAM_AGGREGATED_COMPARE, PARAM_COMPARE_ALL, PARAM_PROJECT_ID,
    PARAM_WORKFLOW_ACTION, PARAM_WORK_ITEM_ID,
};

/// Path of the review page.
pub const REVIEW_PATH: &str = "/polarion/codereview";

/// Link to the review page of a subject.
///
/// Every `with_*` call returns a new link; rendering is done by
/// [`assemble_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLink {
    subject: ItemRef,
    aggregated_compare: bool,
    compare_all: bool,
    workflow_action: Option<WorkflowActionTag>,
    additional: Vec<(String, String)>,
}

impl ReviewLink {
    /// Creates a plain link to `subject`.
    pub fn new(subject: ItemRef) -> Self {
        Self {
            subject,
            aggregated_compare: false,
            compare_all: false,
            workflow_action: None,
            additional: Vec::new(),
        }
    }

    pub fn with_aggregated_compare(self, aggregated_compare: bool) -> Self {
        Self {
            aggregated_compare,
            ..self
        }
    }

    pub fn with_compare_all(self, compare_all: bool) -> Self {
        Self {
            compare_all,
            ..self
        }
    }

    pub fn with_workflow_action(self, workflow_action: Option<WorkflowActionTag>) -> Self {
        Self {
            workflow_action,
            ..self
        }
    }

    /// Appends an extra parameter. Parameters keep their insertion order.
    pub fn with_additional_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.additional.push((name.into(), value.into()));
        self
    }

    pub fn subject(&self) -> &ItemRef {
        &self.subject
    }

    /// Renders the link relative to the server root.
    pub fn to_relative_url(&self) -> String {
        format!("{REVIEW_PATH}?{}", assemble_query(self))
    }
}

impl fmt::Display for ReviewLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_relative_url())
    }
}

/// Encodes the query string of `link`.
///
/// Order: `id`, `projectId`, then `aggregated`, `compareAll` and
/// `workflowAction` when set, then the additional parameters.
pub fn assemble_query(link: &ReviewLink) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair(PARAM_WORK_ITEM_ID, link.subject.id.as_str())
        .append_pair(PARAM_PROJECT_ID, link.subject.project_id.as_str());
    if link.aggregated_compare {
        query.append_pair(PARAM_AGGREGATED_COMPARE, "true");
    }
    if link.compare_all {
        query.append_pair(PARAM_COMPARE_ALL, "true");
    }
    if let Some(action) = link.workflow_action {
        query.append_pair(PARAM_WORKFLOW_ACTION, action.as_str());
    }
    for (name, value) in &link.additional {
        query.append_pair(name, value);
    }
    query.finish()
}
