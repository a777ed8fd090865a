//! Database layer for SQLite storage.
//!
//! This module handles all database operations including:
//! - Connection pool management with WAL mode
//! - Schema migrations
//! - Queries for users, teams, pull requests and reviewer statistics
//! - The bulk deactivation transaction

pub mod deactivation;
pub mod pool;
pub mod pull_requests;
pub mod stats;
pub mod teams;
pub mod users;

use std::path::Path;
use thiserror::Error;

/// Store-level errors.
///
/// `NotFound`, `DuplicateKey` and `Stale` are the signals the engines
/// translate into domain errors; everything else passes through.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate key")]
    DuplicateKey,

    /// A conditional write found the record changed since it was read.
    #[error("record changed since it was read")]
    Stale,

    #[error("Failed to encode query parameter: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::DuplicateKey
            }
            other => Self::Sqlite(other),
        }
    }
}

/// Ordered list of schema migrations.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_initial_schema",
    include_str!("migrations/0001_initial_schema.sql"),
)];

/// Initialize the database with default pool settings.
pub async fn initialize(db_path: &Path) -> Result<pool::DbPool, DbError> {
    initialize_with(db_path, &pool::PoolSettings::default()).await
}

/// Initialize the database: create the file if needed and run migrations.
///
/// # Arguments
/// * `db_path` - Path to the SQLite database file
/// * `settings` - Connection pool sizing and busy timeout
///
/// # Returns
/// A connection pool configured with WAL mode
pub async fn initialize_with(
    db_path: &Path,
    settings: &pool::PoolSettings,
) -> Result<pool::DbPool, DbError> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Migration(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    let pool = pool::create_pool(db_path, settings).await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run all pending database migrations.
async fn run_migrations(pool: &pool::DbPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    for (name, migration_sql) in MIGRATIONS {
        let applied: Option<(i64,)> = sqlx::query_as("SELECT id FROM _migrations WHERE name = ?")
            .bind(*name)
            .fetch_optional(&mut *conn)
            .await?;

        if applied.is_some() {
            continue;
        }

        log::info!("[db] Applying migration {}", name);

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        for statement in parse_sql_statements(migration_sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::Migration(format!("{}: {}", name, e)))?;
        }
        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}

/// Parse SQL statements from a migration file.
///
/// This handles:
/// - Comments (lines starting with --)
/// - Semicolons inside parentheses (e.g., `strftime('%s', 'now')`)
/// - Multi-line statements
fn parse_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current_statement = String::new();
    let mut paren_depth: i32 = 0;

    for line in sql.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("--") {
            continue;
        }

        let line_without_comment = match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        };

        for ch in line_without_comment.chars() {
            match ch {
                '(' => {
                    paren_depth += 1;
                    current_statement.push(ch);
                }
                ')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    current_statement.push(ch);
                }
                ';' if paren_depth == 0 => {
                    let stmt = current_statement.trim().to_string();
                    if !stmt.is_empty() {
                        statements.push(stmt);
                    }
                    current_statement.clear();
                }
                _ => {
                    current_statement.push(ch);
                }
            }
        }

        if !current_statement.is_empty() {
            current_statement.push(' ');
        }
    }

    // Handle any remaining statement without trailing semicolon
    let final_stmt = current_statement.trim().to_string();
    if !final_stmt.is_empty() {
        statements.push(final_stmt);
    }

    statements
}

/// Encode an id list for `json_each(?)` membership tests.
pub(crate) fn id_list(ids: &[String]) -> Result<String, DbError> {
    Ok(serde_json::to_string(ids)?)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_initialize_creates_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let pool = initialize(&db_path).await.unwrap();

        assert!(db_path.exists());

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_migrations' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(
            table_names,
            vec!["pr_reviewers", "pull_requests", "teams", "users"]
        );
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        // Initialize twice
        let _pool1 = initialize(&db_path).await.unwrap();
        let pool2 = initialize(&db_path).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool2)
            .await
            .unwrap();
        assert_eq!(count.0, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_initialize_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/data/test.db");

        initialize(&db_path).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_duplicate_primary_key_is_classified() {
        let (_dir, pool) = test_support::setup_test_db().await;
        test_support::insert_team(&pool, "backend").await;

        let err = sqlx::query("INSERT INTO teams (team_name) VALUES ('backend')")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::DuplicateKey));
    }

    #[test]
    fn test_row_not_found_is_classified() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound
        ));
    }

    #[test]
    fn test_encoding_failure_is_not_a_migration_error() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err = DbError::from(json_err);
        assert!(matches!(err, DbError::Encode(_)));
        assert!(err.to_string().starts_with("Failed to encode"));
    }

    #[test]
    fn test_id_list_is_a_json_array() {
        let ids = vec!["u1".to_string(), "u\"2".to_string()];
        assert_eq!(id_list(&ids).unwrap(), r#"["u1","u\"2"]"#);
    }

    #[test]
    fn test_parse_sql_statements_handles_parens_and_comments() {
        let sql = r#"
            -- leading comment
            CREATE TABLE a (
                id INTEGER, -- trailing comment
                at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            CREATE INDEX idx_a ON a(id)
        "#;

        let statements = parse_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert!(statements[0].contains("strftime('%s', 'now')"));
        assert!(statements[1].starts_with("CREATE INDEX idx_a"));
    }

    #[test]
    fn test_id_list_encodes_json_array() {
        let encoded = id_list(&["u1".to_string(), "u2".to_string()]).unwrap();
        assert_eq!(encoded, r#"["u1","u2"]"#);
    }
}
