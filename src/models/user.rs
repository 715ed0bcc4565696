//! Signed-in user as seen by the web application.

use crate::services::identity::GitkitUser;
use serde::{Deserialize, Serialize};

/// User profile held in the session for the lifetime of the cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity Toolkit local ID (also the preference document ID)
    pub id: String,
    pub email: String,
    /// Display name (may be empty if the provider did not share one)
    pub name: String,
    pub email_verified: bool,
}

impl From<GitkitUser> for User {
    fn from(user: GitkitUser) -> Self {
        Self {
            id: user.local_id,
            email: user.email,
            name: user.display_name.unwrap_or_default(),
            email_verified: user.email_verified,
        }
    }
}
