//! Database queries for teams.

use super::pool::DbPool;
use super::DbError;
use crate::models::{Team, TeamMember};

/// Insert a team and upsert its members in one transaction.
///
/// Existing users are moved into the team and get the supplied username and
/// active flag. Fails with `DuplicateKey` if the team name is taken.
pub async fn create_team(pool: &DbPool, team: &Team) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
        .bind(&team.team_name)
        .execute(&mut *tx)
        .await?;

    for member in &team.members {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, is_active, team_name)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                is_active = excluded.is_active,
                team_name = excluded.team_name
            "#,
        )
        .bind(&member.user_id)
        .bind(&member.username)
        .bind(member.is_active)
        .bind(&team.team_name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Fetch a team with its members ordered by user ID.
pub async fn get_team(pool: &DbPool, team_name: &str) -> Result<Team, DbError> {
    let exists: Option<String> =
        sqlx::query_scalar("SELECT team_name FROM teams WHERE team_name = ?")
            .bind(team_name)
            .fetch_optional(pool)
            .await?;

    let team_name = exists.ok_or(DbError::NotFound)?;

    let members = sqlx::query_as::<_, TeamMember>(
        "SELECT user_id, username, is_active FROM users WHERE team_name = ? ORDER BY user_id",
    )
    .bind(&team_name)
    .fetch_all(pool)
    .await?;

    Ok(Team { team_name, members })
}
