//! Single-user activation and review listing.

use std::sync::Arc;

use super::store::UserDirectory;
use super::upstream;
use crate::db::DbError;
use crate::error::{require_non_empty, AppError};
use crate::models::{PullRequestShort, User};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserDirectory>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Flip a user's active flag. Idempotent. Existing review assignments
    /// are left as they are.
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        require_non_empty(user_id, "user_id")?;

        let user = self
            .users
            .set_is_active(user_id, is_active)
            .await
            .map_err(|e| not_found_or_upstream(e, user_id, "set user active flag"))?;

        log::info!("[users] {} is_active={}", user_id, is_active);
        Ok(user)
    }

    /// Pull requests the user is assigned to review.
    pub async fn reviews(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError> {
        require_non_empty(user_id, "user_id")?;

        self.users
            .reviews_of(user_id)
            .await
            .map_err(|e| not_found_or_upstream(e, user_id, "list reviews"))
    }
}

fn not_found_or_upstream(err: DbError, user_id: &str, operation: &str) -> AppError {
    match err {
        DbError::NotFound => AppError::not_found_with_id("User", user_id),
        other => upstream(operation, other),
    }
}
