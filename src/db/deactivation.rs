//! Bulk deactivation with reviewer repair.
//!
//! Everything happens inside one transaction. The first statement is a
//! write, so the SQLite write lock is held from the start and a concurrent
//! reviewer change either lands before or after the whole batch.

use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite};

use super::pool::DbPool;
use super::{id_list, DbError};
use crate::models::{AffectedPullRequest, MassDeactivateResult, ReassignmentPlan};

/// Deactivate `user_ids` within `team_name` and repair their open reviews.
///
/// Returns zero counts (and still commits) when no active user matched.
/// Any failure, or dropping the future before it completes, rolls back.
pub async fn mass_deactivate_and_reassign(
    pool: &DbPool,
    team_name: &str,
    user_ids: &[String],
) -> Result<MassDeactivateResult, DbError> {
    let mut tx = pool.begin().await?;

    // 1. Deactivate
    let deactivated: Vec<String> = sqlx::query_scalar(
        r#"
        UPDATE users SET is_active = 0
        WHERE team_name = ?
          AND is_active = 1
          AND user_id IN (SELECT value FROM json_each(?))
        RETURNING user_id
        "#,
    )
    .bind(team_name)
    .bind(id_list(user_ids)?)
    .fetch_all(&mut *tx)
    .await?;

    if deactivated.is_empty() {
        tx.commit().await?;
        return Ok(MassDeactivateResult::default());
    }

    let deactivated_json = id_list(&deactivated)?;

    // 2. Candidate pool, already without the users deactivated above
    let pool_ids: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM users WHERE team_name = ? AND is_active = 1 ORDER BY user_id",
    )
    .bind(team_name)
    .fetch_all(&mut *tx)
    .await?;

    // 3. Open pull requests reviewed by any deactivated user, with all reviewers
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT pr.pull_request_id, pr.author_id, r.user_id
        FROM pull_requests pr
        JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
        WHERE pr.status = 'OPEN'
          AND pr.pull_request_id IN (
              SELECT pull_request_id FROM pr_reviewers
              WHERE user_id IN (SELECT value FROM json_each(?))
          )
        ORDER BY pr.pull_request_id, r.rowid
        "#,
    )
    .bind(&deactivated_json)
    .fetch_all(&mut *tx)
    .await?;

    let affected = group_affected(rows);
    let deactivated_set: HashSet<String> = deactivated.iter().cloned().collect();

    // 4. Pick replacements
    let plan = ReassignmentPlan::build(&pool_ids, &deactivated_set, &affected);

    // 5. Delete old pairs, then insert new ones
    if !affected.is_empty() {
        let affected_ids: Vec<String> = affected
            .iter()
            .map(|pr| pr.pull_request_id.clone())
            .collect();

        sqlx::query(
            r#"
            DELETE FROM pr_reviewers
            WHERE user_id IN (SELECT value FROM json_each(?))
              AND pull_request_id IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(&deactivated_json)
        .bind(id_list(&affected_ids)?)
        .execute(&mut *tx)
        .await?;
    }

    if !plan.additions.is_empty() {
        let mut insert =
            QueryBuilder::<Sqlite>::new("INSERT INTO pr_reviewers (pull_request_id, user_id) ");
        insert.push_values(&plan.additions, |mut row, assignment| {
            row.push_bind(&assignment.pull_request_id)
                .push_bind(&assignment.user_id);
        });
        insert.push(" ON CONFLICT (pull_request_id, user_id) DO NOTHING");
        insert.build().execute(&mut *tx).await?;
    }

    // 6. Commit
    tx.commit().await?;

    Ok(MassDeactivateResult {
        deactivated_count: deactivated.len() as u64,
        reassigned_count: plan.reassigned_prs,
    })
}

/// Fold (pr, author, reviewer) rows, ordered by PR, into one entry per PR.
fn group_affected(rows: Vec<(String, String, String)>) -> Vec<AffectedPullRequest> {
    let mut affected: Vec<AffectedPullRequest> = Vec::new();

    for (pr_id, author_id, reviewer_id) in rows {
        match affected.last_mut() {
            Some(last) if last.pull_request_id == pr_id => last.reviewer_ids.push(reviewer_id),
            _ => affected.push(AffectedPullRequest {
                pull_request_id: pr_id,
                author_id,
                reviewer_ids: vec![reviewer_id],
            }),
        }
    }

    affected
}
