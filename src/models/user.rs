//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A team member who can author and review pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Caller-supplied identity (e.g., "u1").
    pub user_id: String,

    /// Display name.
    pub username: String,

    /// Inactive users are never picked as reviewers.
    pub is_active: bool,

    /// Owning team (FK to teams).
    pub team_name: String,
}

impl User {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        is_active: bool,
        team_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            is_active,
            team_name: team_name.into(),
        }
    }
}
