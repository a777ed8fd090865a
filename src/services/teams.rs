//! Team creation and lookup.

use std::sync::Arc;

use super::store::UserDirectory;
use super::upstream;
use crate::db::DbError;
use crate::error::{require_non_empty, AppError};
use crate::models::Team;

#[derive(Clone)]
pub struct TeamService {
    users: Arc<dyn UserDirectory>,
}

impl TeamService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Create a team. Members that already exist are moved into it and
    /// take the supplied username and active flag.
    pub async fn create(&self, team: Team) -> Result<Team, AppError> {
        require_non_empty(&team.team_name, "team_name")?;
        for member in &team.members {
            require_non_empty(&member.user_id, "user_id")?;
        }

        self.users.create_team(&team).await.map_err(|e| match e {
            DbError::DuplicateKey => {
                log::warn!("[teams] {} already exists", team.team_name);
                AppError::team_exists(&team.team_name)
            }
            other => upstream("create team", other),
        })?;

        log::info!(
            "[teams] Created {} with {} member(s)",
            team.team_name,
            team.members.len()
        );
        Ok(team)
    }

    pub async fn get(&self, team_name: &str) -> Result<Team, AppError> {
        require_non_empty(team_name, "team_name")?;

        self.users.get_team(team_name).await.map_err(|e| match e {
            DbError::NotFound => AppError::not_found_with_id("Team", team_name),
            other => upstream("get team", other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::TeamMember;
    use crate::services::memory::InMemoryBackend;

    fn team(name: &str, members: &[(&str, &str, bool)]) -> Team {
        Team {
            team_name: name.into(),
            members: members
                .iter()
                .map(|(id, username, active)| TeamMember {
                    user_id: id.to_string(),
                    username: username.to_string(),
                    is_active: *active,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = TeamService::new(Arc::new(InMemoryBackend::with_seed(1)));

        let created = service
            .create(team("backend", &[("u1", "Alice", true), ("u2", "Bob", false)]))
            .await
            .unwrap();
        assert_eq!(created.members.len(), 2);

        let fetched = service.get("backend").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_team() {
        let service = TeamService::new(Arc::new(InMemoryBackend::with_seed(1)));
        service.create(team("backend", &[])).await.unwrap();

        let err = service.create(team("backend", &[])).await.unwrap_err();
        assert!(matches!(err, AppError::TeamExists { .. }));
    }

    #[tokio::test]
    async fn test_missing_team() {
        let service = TeamService::new(Arc::new(InMemoryBackend::with_seed(1)));
        let err = service.get("nobody").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_blank_member_id_is_rejected() {
        let service = TeamService::new(Arc::new(InMemoryBackend::with_seed(1)));
        let err = service
            .create(team("backend", &[("", "Nobody", true)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
