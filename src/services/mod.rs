//! Business logic services.
//!
//! The engines in this module own the reviewer assignment rules. They reach
//! storage only through the traits in [`store`], so the same rules run
//! against SQLite in production and against [`memory::InMemoryBackend`]
//! in tests.

pub mod deactivation;
pub mod memory;
pub mod pr_assignment;
pub mod stats;
pub mod store;
pub mod teams;
pub mod users;

pub use deactivation::DeactivationEngine;
pub use memory::InMemoryBackend;
pub use pr_assignment::{PrAssignmentEngine, Reassignment};
pub use stats::StatsService;
pub use store::{PullRequestStore, SqlitePullRequestStore, SqliteUserDirectory, UserDirectory};
pub use teams::TeamService;
pub use users::UserService;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::db::pool::DbPool;
use crate::db::DbError;
use crate::error::AppError;

/// All services wired to one pair of stores.
#[derive(Clone)]
pub struct Services {
    pub pull_requests: PrAssignmentEngine,
    pub deactivation: DeactivationEngine,
    pub users: UserService,
    pub teams: TeamService,
    pub stats: StatsService,
}

impl Services {
    pub fn new(users: Arc<dyn UserDirectory>, pull_requests: Arc<dyn PullRequestStore>) -> Self {
        Self {
            pull_requests: PrAssignmentEngine::new(users.clone(), pull_requests.clone()),
            deactivation: DeactivationEngine::new(pull_requests.clone()),
            users: UserService::new(users.clone()),
            teams: TeamService::new(users),
            stats: StatsService::new(pull_requests),
        }
    }

    /// Services backed by a SQLite pool.
    pub fn sqlite(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqliteUserDirectory::new(pool.clone())),
            Arc::new(SqlitePullRequestStore::new(pool)),
        )
    }

    /// Services backed by one shared in-memory store.
    pub fn in_memory(backend: Arc<InMemoryBackend>) -> Self {
        Self::new(backend.clone(), backend)
    }
}

/// Run `fut` with a deadline.
///
/// On expiry the future is dropped, which rolls back any transaction it
/// had open, and `AppError::Timeout` is returned.
pub async fn with_deadline<T, F>(budget: Duration, operation: &str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("[deadline] {} exceeded {:?}", operation, budget);
            Err(AppError::timeout(operation))
        }
    }
}

/// Log an unclassified store failure and wrap it for the caller.
pub(crate) fn upstream(operation: &str, err: DbError) -> AppError {
    log::error!("[store] {} failed: {}", operation, err);
    AppError::database_with_op(err.to_string(), operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let value = with_deadline(Duration::from_millis(100), "noop", async {
            Ok::<_, AppError>(5)
        })
        .await
        .unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let err = with_deadline(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_upstream_keeps_operation() {
        let err = upstream("merge pull request", DbError::Migration("locked".into()));
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("locked"));
        match err {
            AppError::Database { operation, .. } => {
                assert_eq!(operation.as_deref(), Some("merge pull request"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
