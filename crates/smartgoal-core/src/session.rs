//! The logged-in user, passed explicitly to whatever needs it.
//!
//! A [`Session`] starts anonymous, is established once the backend's
//! current-user lookup succeeds, and is cleared on logout.

use crate::error::{CoreError, Result};
use crate::model::UserPublic;

/// Who the client is acting as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<UserPublic>,
}

impl Session {
    /// Creates a session with no user.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    /// Records the user returned by a successful current-user fetch.
    pub fn establish(&mut self, user: UserPublic) {
        tracing::debug!(user_id = %user.id, "Session established");
        self.user = Some(user);
    }

    /// Forgets the user (logout).
    pub fn clear(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::debug!(user_id = %user.id, "Session cleared");
        }
    }

    /// The logged-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserPublic> {
        self.user.as_ref()
    }

    /// Returns `true` once a user has been established.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The logged-in user, or [`CoreError::NotLoggedIn`].
    pub fn require_user(&self) -> Result<&UserPublic> {
        self.user.as_ref().ok_or(CoreError::NotLoggedIn)
    }
}
