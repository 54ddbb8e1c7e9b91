//! crates/chapter_map_core/src/viewer.rs
//!
//! The identity of whoever is making a request, passed explicitly to every
//! operation that needs it.

use crate::domain::{User, UserId};
use crate::ports::{PortError, PortResult};

/// A signed-in user as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl CurrentUser {
    /// The name stamped on maps and comments.
    pub fn author_name(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous")
            .to_string()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            display_name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

/// Either a signed-in user or an anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer(Option<CurrentUser>);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn signed_in(user: CurrentUser) -> Self {
        Self(Some(user))
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.0.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }

    /// The signed-in user, or `Unauthorized` so the caller can prompt sign-in.
    pub fn require_user(&self) -> PortResult<&CurrentUser> {
        self.0.as_ref().ok_or(PortError::Unauthorized)
    }
}
