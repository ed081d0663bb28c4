//! Resolving users to comparable identities.

use codereview_models::UserId;
use serde::{Deserialize, Serialize};

use crate::parameters::ReviewParameters;

/// A user id together with its display name, when the user is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerIdentity {
    /// User id, absent for an anonymous identity.
    pub id: Option<UserId>,
    /// Display name, absent when the user could not be resolved.
    pub name: Option<String>,
}

impl ReviewerIdentity {
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_ref().is_some_and(|own| own.as_str() == id)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// Returns true if `id_or_name` matches either the id or the name.
    pub fn has_id_or_name(&self, id_or_name: &str) -> bool {
        self.has_id(id_or_name) || self.has_name(id_or_name)
    }
}

impl ReviewParameters {
    /// Resolves `user` through the user directory.
    pub fn identity_for_user(&self, user: Option<&UserId>) -> ReviewerIdentity {
        let name = user.and_then(|user| self.context.users.display_name(user));
        ReviewerIdentity {
            id: user.cloned(),
            name,
        }
    }

    /// Resolves the current user.
    pub fn identity_for_current_user(&self) -> ReviewerIdentity {
        let current = self.context.security.current_user();
        self.identity_for_user(current.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{parameters_for, MemoryItems, MemorySecurity, PATTERN_ONLY};

    #[test]
    fn test_known_user_has_id_and_name() {
        let params = parameters_for(
            PATTERN_ONLY,
            Arc::new(MemoryItems::default()),
            MemorySecurity::as_user("alice"),
            |_| {},
        );

        let identity = params.identity_for_current_user();
        assert!(identity.has_id("alice"));
        assert!(identity.has_name("Alice Adams"));
        assert!(identity.has_id_or_name("Alice Adams"));
        assert!(!identity.has_id_or_name("Bob Brown"));
    }

    #[test]
    fn test_unresolved_user_keeps_id() {
        let params = parameters_for(
            PATTERN_ONLY,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default(),
            |_| {},
        );

        let identity = params.identity_for_user(Some(&UserId::from("ghost")));
        assert!(identity.has_id("ghost"));
        assert_eq!(identity.name, None);
        assert!(!identity.has_name("ghost"));
        assert!(identity.has_id_or_name("ghost"));
    }

    #[test]
    fn test_anonymous_identity_matches_nothing() {
        let params = parameters_for(
            PATTERN_ONLY,
            Arc::new(MemoryItems::default()),
            MemorySecurity::default(),
            |_| {},
        );

        let identity = params.identity_for_current_user();
        assert_eq!(identity, ReviewerIdentity::default());
        assert!(!identity.has_id_or_name(""));
    }
}
