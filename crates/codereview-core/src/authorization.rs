//! Review eligibility and reviewer permissions.
//!
//! Each check treats an unconfigured setting as permissive. Retroactive
//! permission ([`ReviewParameters::is_or_was_permitted_reviewer`]) is a union
//! of the current role with the fast-track reviewer and the past reviewer
//! allowlist, so it stays true after a role is revoked.

use codereview_models::UserId;
use tracing::debug;

use crate::error::Result;
use crate::parameters::ReviewParameters;

impl ReviewParameters {
    /// Returns true if the subject may be reviewed in its current status.
    ///
    /// Without a configured `inReviewStatus` every status qualifies.
    pub fn is_in_review_status(&self) -> Result<bool> {
        let Some(in_review) = self.configuration.in_review_status() else {
            return Ok(true);
        };
        let status = self.context.items.status(&self.subject)?;
        Ok(status.as_deref() == Some(in_review))
    }

    /// Returns true if the current user holds the reviewer role in the
    /// subject's project, or no reviewer role is configured.
    pub fn has_reviewer_role(&self) -> Result<bool> {
        let Some(role) = self.configuration.reviewer_role() else {
            return Ok(true);
        };
        match self.context.security.current_user() {
            Some(user) => self.holds_role(&user, role),
            None => Ok(false),
        }
    }

    /// Returns true if the current user may review the subject now.
    pub fn can_review(&self) -> Result<bool> {
        let permitted = self.is_in_review_status()? && self.has_reviewer_role()?;
        debug!(subject = %self.subject, permitted, "evaluated review permission");
        Ok(permitted)
    }

    /// Returns true if `user` is, or at some point was, allowed to review.
    ///
    /// An absent user is always permitted.
    pub fn is_or_was_permitted_reviewer(&self, user: Option<&UserId>) -> Result<bool> {
        let Some(user) = user else {
            return Ok(true);
        };
        let Some(role) = self.configuration.reviewer_role() else {
            return Ok(true);
        };
        if self.configuration.fast_track_reviewer() == Some(user.as_str())
            || self.configuration.past_reviewers().contains(user.as_str())
        {
            return Ok(true);
        }
        self.holds_role(user, role)
    }

    /// Returns true if changes at `path` may be fast-tracked.
    ///
    /// An absent path is permitted; otherwise the whole path must match
    /// `fastTrackPermittedLocationPattern`.
    pub fn is_location_permitted_for_fast_track(&self, path: Option<&str>) -> bool {
        path.map_or(true, |path| self.configuration.matches_fast_track_location(path))
    }

    fn holds_role(&self, user: &UserId, role: &str) -> Result<bool> {
        let roles = self
            .context
            .security
            .roles_for_user(user, &self.subject.project_id)?;
        Ok(roles.contains(role))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{parameters_for, MemoryItems, MemorySecurity, PATTERN_ONLY};

    const ROLE_AND_STATUS: &str = "\
fastTrackPermittedLocationPattern=^/trunk/.*$
inReviewStatus=inProgress
reviewerRole=reviewers
";

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn test_unconfigured_checks_permit_everything() {
        for status in ["open", "inProgress", "closed"] {
            let params = parameters_for(
                PATTERN_ONLY,
                Arc::new(MemoryItems::with_status(status)),
                MemorySecurity::default(),
                |_| {},
            );
            assert!(params.can_review().unwrap());
        }
    }

    #[test]
    fn test_in_review_status_without_role_denies() {
        let params = parameters_for(
            ROLE_AND_STATUS,
            Arc::new(MemoryItems::with_status("inProgress")),
            MemorySecurity::as_user("carol"),
            |_| {},
        );
        assert!(params.is_in_review_status().unwrap());
        assert!(!params.has_reviewer_role().unwrap());
        assert!(!params.can_review().unwrap());
    }

    #[test]
    fn test_can_review_requires_status_and_role() {
        let security = || MemorySecurity::as_user("carol").grant("carol", "reviewers");

        let params = parameters_for(
            ROLE_AND_STATUS,
            Arc::new(MemoryItems::with_status("inProgress")),
            security(),
            |_| {},
        );
        assert!(params.can_review().unwrap());

        let params = parameters_for(
            ROLE_AND_STATUS,
            Arc::new(MemoryItems::with_status("open")),
            security(),
            |_| {},
        );
        assert!(!params.can_review().unwrap());
    }

    #[test]
    fn test_no_current_user_has_no_role() {
        let params = parameters_for(
            ROLE_AND_STATUS,
            Arc::new(MemoryItems::with_status("inProgress")),
            MemorySecurity::default(),
            |_| {},
        );
        assert!(!params.has_reviewer_role().unwrap());
    }

    #[test]
    fn test_anyone_was_permitted_without_role() {
        let params = parameters_for(
            PATTERN_ONLY,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default(),
            |_| {},
        );
        assert!(params.is_or_was_permitted_reviewer(None).unwrap());
        assert!(params.is_or_was_permitted_reviewer(Some(&user("mallory"))).unwrap());
    }

    #[test]
    fn test_past_reviewer_keeps_permission() {
        let config = format!("{ROLE_AND_STATUS}pastReviewers=alice   bob\n");
        let params = parameters_for(
            &config,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default().grant("carol", "reviewers"),
            |_| {},
        );

        assert!(params.is_or_was_permitted_reviewer(Some(&user("bob"))).unwrap());
        assert!(params.is_or_was_permitted_reviewer(Some(&user("carol"))).unwrap());
        assert!(!params.is_or_was_permitted_reviewer(Some(&user("dave"))).unwrap());
        assert!(params.is_or_was_permitted_reviewer(None).unwrap());
    }

    #[test]
    fn test_fast_track_reviewer_was_permitted() {
        let config = format!("{ROLE_AND_STATUS}fastTrackReviewer=robot\n");
        let params = parameters_for(
            &config,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default(),
            |_| {},
        );
        assert!(params.is_or_was_permitted_reviewer(Some(&user("robot"))).unwrap());
    }

    #[test]
    fn test_fast_track_location() {
        let params = parameters_for(
            ROLE_AND_STATUS,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default(),
            |_| {},
        );
        assert!(params.is_location_permitted_for_fast_track(Some("/trunk/src/lib.rs")));
        assert!(!params.is_location_permitted_for_fast_track(Some("/branch/x")));
        assert!(params.is_location_permitted_for_fast_track(None));
    }
}
