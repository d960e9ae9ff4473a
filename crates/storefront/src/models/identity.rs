//! Authenticated user profile.

use serde::{Deserialize, Serialize};

use julid_core::{Email, UserId};

/// The signed-in user's profile, as returned by login/register and as
/// persisted under the `user` storage key.
///
/// The bearer credential lives next to it in the session, never in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        rename = "fullName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub full_name: Option<String>,
}

impl Identity {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return &self.name;
        }
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("User")
    }
}
