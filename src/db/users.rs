//! Database queries for users and reviewer candidates.

use super::pool::DbPool;
use super::{id_list, DbError};
use crate::models::{PullRequestShort, User};

/// Look up a user by ID.
pub async fn get_user(pool: &DbPool, user_id: &str) -> Result<User, DbError> {
    sqlx::query_as::<_, User>(
        "SELECT user_id, username, is_active, team_name FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Up to `limit` active members of `team_name` other than `exclude_user_id`,
/// sampled uniformly at random.
pub async fn review_candidates(
    pool: &DbPool,
    team_name: &str,
    exclude_user_id: &str,
    limit: usize,
) -> Result<Vec<User>, DbError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT user_id, username, is_active, team_name
        FROM users
        WHERE team_name = ? AND is_active = 1 AND user_id != ?
        ORDER BY RANDOM()
        LIMIT ?
        "#,
    )
    .bind(team_name)
    .bind(exclude_user_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// One random active member of `team_name` outside `exclude_user_ids`.
pub async fn replacement_candidate(
    pool: &DbPool,
    team_name: &str,
    exclude_user_ids: &[String],
) -> Result<User, DbError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT user_id, username, is_active, team_name
        FROM users
        WHERE team_name = ?
          AND is_active = 1
          AND user_id NOT IN (SELECT value FROM json_each(?))
        ORDER BY RANDOM()
        LIMIT 1
        "#,
    )
    .bind(team_name)
    .bind(id_list(exclude_user_ids)?)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Set a user's active flag and return the updated row.
pub async fn set_is_active(pool: &DbPool, user_id: &str, is_active: bool) -> Result<User, DbError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET is_active = ?
        WHERE user_id = ?
        RETURNING user_id, username, is_active, team_name
        "#,
    )
    .bind(is_active)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Pull requests the user is assigned to review.
///
/// Fails with `NotFound` if the user does not exist.
pub async fn reviews_of(pool: &DbPool, user_id: &str) -> Result<Vec<PullRequestShort>, DbError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    if exists.is_none() {
        return Err(DbError::NotFound);
    }

    let reviews = sqlx::query_as::<_, PullRequestShort>(
        r#"
        SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
        FROM pull_requests pr
        JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
        WHERE r.user_id = ?
        ORDER BY pr.created_at, pr.pull_request_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(reviews)
}
