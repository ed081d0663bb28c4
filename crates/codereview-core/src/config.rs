//! Review configuration of a project scope.
//!
//! # Keys and defaults
//!
//! | key | when absent |
//! |-----|-------------|
//! | `lastReviewedRevisionField` | no baseline, review from the beginning |
//! | `reviewedRevisionsField` | fall through to the baseline strategy |
//! | `reviewerField` | reviewer cannot be written |
//! | `inReviewStatus` | every status counts as in review |
//! | `successfulReviewWorkflowAction` | successful review cannot transition |
//! | `successfulReviewResolution` | resolution is left untouched |
//! | `fastTrackPermittedLocationPattern` | **required**, construction fails |
//! | `fastTrackReviewer` | no designated fast-track reviewer |
//! | `unresolvedWorkItemWithRevisionsNeedsTimePoint` | `false` |
//! | `reviewerRole` | everybody may review |
//! | `pastReviewers` | empty |

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{Result, ReviewError};
use crate::properties::Properties;

/// Location of the configuration file relative to the scope root.
pub const CONFIG_PATH: &str = ".polarion/codereview/codereview.properties";

pub const CONFIG_LAST_REVIEWED_REVISION_FIELD: &str = "lastReviewedRevisionField";
pub const CONFIG_REVIEWED_REVISIONS_FIELD: &str = "reviewedRevisionsField";
pub const CONFIG_REVIEWER_FIELD: &str = "reviewerField";
pub const CONFIG_IN_REVIEW_STATUS: &str = "inReviewStatus";
pub const CONFIG_SUCCESSFUL_REVIEW_WF_ACTION: &str = "successfulReviewWorkflowAction";
pub const CONFIG_SUCCESSFUL_REVIEW_RESOLUTION: &str = "successfulReviewResolution";
pub const CONFIG_FAST_TRACK_PERMITTED_LOCATION_PATTERN: &str = "fastTrackPermittedLocationPattern";
pub const CONFIG_FAST_TRACK_REVIEWER: &str = "fastTrackReviewer";
pub const CONFIG_UNRESOLVED_WORK_ITEM_WITH_REVISIONS_NEEDS_TIMEPOINT: &str =
    "unresolvedWorkItemWithRevisionsNeedsTimePoint";
pub const CONFIG_REVIEWER_ROLE: &str = "reviewerRole";
pub const CONFIG_PAST_REVIEWERS: &str = "pastReviewers";

/// Immutable review configuration of one project scope.
#[derive(Debug, Clone)]
pub struct ReviewConfiguration {
    last_reviewed_revision_field: Option<String>,
    reviewed_revisions_field: Option<String>,
    reviewer_field: Option<String>,
    in_review_status: Option<String>,
    successful_review_workflow_action: Option<String>,
    successful_review_resolution: Option<String>,
    fast_track_pattern: Regex,
    fast_track_pattern_source: String,
    fast_track_reviewer: Option<String>,
    unresolved_work_item_with_revisions_needs_time_point: bool,
    reviewer_role: Option<String>,
    past_reviewers: BTreeSet<String>,
}

impl ReviewConfiguration {
    /// Builds the configuration from parsed properties.
    ///
    /// Fails if the fast-track pattern is absent or does not compile.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let owned = |key: &str| properties.get(key).map(str::to_string);

        let pattern_source = properties
            .get(CONFIG_FAST_TRACK_PERMITTED_LOCATION_PATTERN)
            .ok_or(ReviewError::MissingFastTrackPattern)?;
        // Location paths must match as a whole, not just contain a match.
        let fast_track_pattern = Regex::new(&format!("^(?:{})$", pattern_source)).map_err(
            |source| ReviewError::InvalidFastTrackPattern {
                pattern: pattern_source.to_string(),
                source,
            },
        )?;

        let past_reviewers = properties
            .get(CONFIG_PAST_REVIEWERS)
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            last_reviewed_revision_field: owned(CONFIG_LAST_REVIEWED_REVISION_FIELD),
            reviewed_revisions_field: owned(CONFIG_REVIEWED_REVISIONS_FIELD),
            reviewer_field: owned(CONFIG_REVIEWER_FIELD),
            in_review_status: owned(CONFIG_IN_REVIEW_STATUS),
            successful_review_workflow_action: owned(CONFIG_SUCCESSFUL_REVIEW_WF_ACTION),
            successful_review_resolution: owned(CONFIG_SUCCESSFUL_REVIEW_RESOLUTION),
            fast_track_pattern,
            fast_track_pattern_source: pattern_source.to_string(),
            fast_track_reviewer: owned(CONFIG_FAST_TRACK_REVIEWER),
            unresolved_work_item_with_revisions_needs_time_point: parse_bool(
                properties.get(CONFIG_UNRESOLVED_WORK_ITEM_WITH_REVISIONS_NEEDS_TIMEPOINT),
            ),
            reviewer_role: owned(CONFIG_REVIEWER_ROLE),
            past_reviewers,
        })
    }

    /// Parses properties text and builds the configuration.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_properties(&Properties::parse(text)?)
    }

    /// Field holding the last reviewed revision. Empty names count as absent.
    pub fn last_reviewed_revision_field(&self) -> Option<&str> {
        self.last_reviewed_revision_field
            .as_deref()
            .filter(|field| !field.is_empty())
    }

    /// Field holding the raw reviewed-revisions string.
    pub fn reviewed_revisions_field(&self) -> Option<&str> {
        self.reviewed_revisions_field.as_deref()
    }

    /// Field holding the reviewer.
    pub fn reviewer_field(&self) -> Option<&str> {
        self.reviewer_field.as_deref()
    }

    /// Status an item must have to be reviewed.
    pub fn in_review_status(&self) -> Option<&str> {
        self.in_review_status.as_deref()
    }

    /// Native action id of the transition taken after a successful review.
    pub fn successful_review_workflow_action(&self) -> Option<&str> {
        self.successful_review_workflow_action.as_deref()
    }

    /// Resolution set before the successful-review transition.
    pub fn successful_review_resolution(&self) -> Option<&str> {
        self.successful_review_resolution.as_deref()
    }

    /// Returns true if `path` as a whole matches the fast-track pattern.
    pub fn matches_fast_track_location(&self, path: &str) -> bool {
        self.fast_track_pattern.is_match(path)
    }

    /// The fast-track pattern as configured.
    pub fn fast_track_pattern(&self) -> &str {
        &self.fast_track_pattern_source
    }

    /// User allowed to review on the fast track.
    pub fn fast_track_reviewer(&self) -> Option<&str> {
        self.fast_track_reviewer.as_deref()
    }

    /// Whether unresolved items with linked revisions need a time point.
    pub fn unresolved_work_item_with_revisions_needs_time_point(&self) -> bool {
        self.unresolved_work_item_with_revisions_needs_time_point
    }

    /// Role required to review.
    pub fn reviewer_role(&self) -> Option<&str> {
        self.reviewer_role.as_deref()
    }

    /// Users that reviewed in the past and stay permitted.
    pub fn past_reviewers(&self) -> &BTreeSet<String> {
        &self.past_reviewers
    }
}

/// Only a case-insensitive `true` is true.
pub(crate) fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}
