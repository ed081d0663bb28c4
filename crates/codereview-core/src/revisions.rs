//! Choosing the revisions presented for review.

use codereview_models::{FieldValue, RevisionSet};
use tracing::debug;

use crate::error::{Result, ReviewError};
use crate::parameters::ReviewParameters;

impl ReviewParameters {
    /// Computes the revisions to present for review.
    ///
    /// `compareAll` wins over everything else, then an explicit
    /// reviewed-revisions value, then the last reviewed revision as baseline.
    /// Unless comparing all, the last reviewed revision is always read, so a
    /// non-numeric value fails even when a reviewed set is present.
    pub fn create_revisions(&self) -> Result<RevisionSet> {
        let linked = self.context.items.linked_revisions(&self.subject)?;

        if self.is_compare_all() {
            debug!(subject = %self.subject, "comparing all linked revisions");
            return Ok(RevisionSet::above(linked, None));
        }

        let baseline = self.last_reviewed_revision()?;
        if let Some(raw) = self.reviewed_revisions()? {
            debug!(subject = %self.subject, reviewed = %raw, "using reviewed revisions");
            return Ok(RevisionSet::reviewed(linked, raw));
        }

        debug!(subject = %self.subject, baseline = ?baseline, "using last reviewed revision");
        Ok(RevisionSet::above(linked, baseline))
    }

    /// Reads the last reviewed revision number.
    ///
    /// Accepts an integer field or a numeric text field. Returns `None` when
    /// the field is unconfigured, empty or holds an enumeration option.
    pub fn last_reviewed_revision(&self) -> Result<Option<i64>> {
        let Some(field) = self.configuration.last_reviewed_revision_field() else {
            return Ok(None);
        };
        match self.context.items.field_value(&self.subject, field)? {
            Some(FieldValue::Integer(value)) => Ok(Some(value)),
            Some(FieldValue::Text(value)) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|source| ReviewError::RevisionParse { value, source }),
            Some(FieldValue::Option(_)) | None => Ok(None),
        }
    }

    /// Reads the raw reviewed-revisions value, if the field is configured
    /// and set.
    pub fn reviewed_revisions(&self) -> Result<Option<String>> {
        let Some(field) = self.configuration.reviewed_revisions_field() else {
            return Ok(None);
        };
        Ok(self
            .context
            .items
            .field_value(&self.subject, field)?
            .map(|value| value.as_text()))
    }
}
