//! Reviewer assignment statistics.

use super::pool::DbPool;
use super::DbError;
use crate::models::ReviewerStat;

/// Review assignment counts per user, busiest first.
///
/// Counts every assignment regardless of pull request status. Users with
/// no assignments are omitted.
pub async fn reviewer_stats(pool: &DbPool) -> Result<Vec<ReviewerStat>, DbError> {
    let stats = sqlx::query_as::<_, ReviewerStat>(
        r#"
        SELECT user_id, COUNT(*) AS review_count
        FROM pr_reviewers
        GROUP BY user_id
        ORDER BY review_count DESC, user_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_pr, insert_team, insert_user, setup_test_db};

    #[tokio::test]
    async fn test_reviewer_stats_ordering() {
        let (_dir, pool) = setup_test_db().await;
        insert_team(&pool, "backend").await;
        for id in ["u1", "u2", "u3", "u4"] {
            insert_user(&pool, id, "backend", true).await;
        }
        insert_pr(&pool, "pr-1", "u1", "OPEN", &["u2", "u3"]).await;
        insert_pr(&pool, "pr-2", "u1", "MERGED", &["u3"]).await;
        insert_pr(&pool, "pr-3", "u4", "OPEN", &["u2"]).await;

        let stats = reviewer_stats(&pool).await.unwrap();
        assert_eq!(
            stats,
            vec![
                ReviewerStat {
                    user_id: "u2".into(),
                    review_count: 2
                },
                ReviewerStat {
                    user_id: "u3".into(),
                    review_count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reviewer_stats_empty() {
        let (_dir, pool) = setup_test_db().await;
        assert!(reviewer_stats(&pool).await.unwrap().is_empty());
    }
}
