//! Database queries for pull requests and the reviewer relation.

use super::pool::DbPool;
use super::{id_list, DbError};
use crate::models::{PullRequest, PullRequestRow, PullRequestStatus, User};

/// Insert a pull request and its reviewer rows in one transaction.
///
/// Fails with `DuplicateKey` if the ID is taken.
pub async fn create_pull_request(pool: &DbPool, pr: &PullRequest) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at, merged_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&pr.pull_request_id)
    .bind(&pr.pull_request_name)
    .bind(&pr.author_id)
    .bind(pr.status.as_str())
    .bind(pr.created_at)
    .bind(pr.merged_at)
    .execute(&mut *tx)
    .await?;

    for reviewer in &pr.reviewers {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
            .bind(&pr.pull_request_id)
            .bind(&reviewer.user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Fetch a pull request with its reviewers in assignment order.
pub async fn get_pull_request(pool: &DbPool, pr_id: &str) -> Result<PullRequest, DbError> {
    let row = sqlx::query_as::<_, PullRequestRow>(
        r#"
        SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
        FROM pull_requests
        WHERE pull_request_id = ?
        "#,
    )
    .bind(pr_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    let reviewers = sqlx::query_as::<_, User>(
        r#"
        SELECT u.user_id, u.username, u.is_active, u.team_name
        FROM pr_reviewers r
        JOIN users u ON u.user_id = r.user_id
        WHERE r.pull_request_id = ?
        ORDER BY r.rowid
        "#,
    )
    .bind(pr_id)
    .fetch_all(pool)
    .await?;

    Ok(row.with_reviewers(reviewers))
}

/// Persist `status` and `merged_at`.
pub async fn update_status(pool: &DbPool, pr: &PullRequest) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pull_requests SET status = ?, merged_at = ? WHERE pull_request_id = ?",
    )
    .bind(pr.status.as_str())
    .bind(pr.merged_at)
    .bind(&pr.pull_request_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Replace the whole reviewer set of `pr` in one transaction, provided
/// nothing changed since the caller read it.
///
/// The write goes through only while the pull request is still open, its
/// reviewers are still `expected_reviewer_ids` and every newly added
/// reviewer is still active. Otherwise nothing is written and `Stale` is
/// returned. `NotFound` if the pull request is gone.
pub async fn replace_reviewers(
    pool: &DbPool,
    pr: &PullRequest,
    expected_reviewer_ids: &[String],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    // Write first so the checks below run under the write lock
    let claimed = sqlx::query(
        "UPDATE pull_requests SET status = status WHERE pull_request_id = ? AND status = ?",
    )
    .bind(&pr.pull_request_id)
    .bind(PullRequestStatus::Open.as_str())
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT status FROM pull_requests WHERE pull_request_id = ?")
                .bind(&pr.pull_request_id)
                .fetch_optional(&mut *tx)
                .await?;
        return Err(match exists {
            Some(_) => DbError::Stale,
            None => DbError::NotFound,
        });
    }

    let current: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY user_id",
    )
    .bind(&pr.pull_request_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut expected = expected_reviewer_ids.to_vec();
    expected.sort();
    expected.dedup();
    if current != expected {
        return Err(DbError::Stale);
    }

    let added: Vec<String> = pr
        .reviewer_ids()
        .into_iter()
        .filter(|id| !expected.contains(id))
        .collect();
    if !added.is_empty() {
        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE is_active = 1 AND user_id IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(id_list(&added)?)
        .fetch_one(&mut *tx)
        .await?;

        if active as usize != added.len() {
            return Err(DbError::Stale);
        }
    }

    sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ?")
        .bind(&pr.pull_request_id)
        .execute(&mut *tx)
        .await?;

    for reviewer in &pr.reviewers {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
            .bind(&pr.pull_request_id)
            .bind(&reviewer.user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
