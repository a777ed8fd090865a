//! Team model.
//!
//! Teams are stored as a bare name; membership lives on the user row.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::User;

/// A team member as supplied on team creation and returned on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

impl TeamMember {
    /// Bind this member to a team.
    pub fn into_user(self, team_name: &str) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            is_active: self.is_active,
            team_name: team_name.to_string(),
        }
    }
}

impl From<User> for TeamMember {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            is_active: user.is_active,
        }
    }
}

/// A team with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}
