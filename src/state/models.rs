//! Records published into the shared store.

use serde::{Deserialize, Serialize};

/// Profile returned by the OAuth provider's user-info endpoint.
///
/// Every field is optional; `UserProfile::default()` is the empty record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub sub: Option<String>,
    pub email: Option<String>,
    pub updated_at: Option<String>,
    /// Issued-at, unix seconds.
    pub iat: Option<i64>,
    /// Expiry, unix seconds.
    pub exp: Option<i64>,
}

impl UserProfile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Nickname, ignoring blank values.
    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Account identity used to scope the task list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    /// Email of the owning user.
    pub user: String,
}

/// Tasks owned by `user`. Empty when no user or the user has no email.
#[must_use]
pub fn user_tasks(tasks: &[Task], user: Option<&User>) -> Vec<Task> {
    let Some(email) = user.and_then(|u| u.email.as_deref()) else {
        return Vec::new();
    };
    tasks.iter().filter(|t| t.user == email).cloned().collect()
}
