//! Store contracts consumed by the engines.
//!
//! The engines only see these traits. `SqliteUserDirectory` and
//! `SqlitePullRequestStore` back them with the `db` module; the in-memory
//! backend in [`super::memory`] backs them for deterministic tests.
//!
//! Every method reports store-level errors as [`DbError`]. `NotFound`,
//! `DuplicateKey` and `Stale` are the only variants engines translate;
//! everything else passes through as an upstream failure.

use async_trait::async_trait;

use crate::db::pool::DbPool;
use crate::db::{self, DbError};
use crate::models::{
    MassDeactivateResult, PullRequest, PullRequestShort, ReviewerStat, Team, User, MAX_REVIEWERS,
};

/// Users and teams.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by ID.
    async fn get_by_id(&self, user_id: &str) -> Result<User, DbError>;

    /// Up to two active members of `team_name` other than `exclude_user_id`,
    /// sampled uniformly without replacement.
    async fn review_candidates(
        &self,
        team_name: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, DbError>;

    /// One random active member of `team_name` outside `exclude_user_ids`.
    ///
    /// `NotFound` when nobody qualifies.
    async fn replacement_candidate(
        &self,
        team_name: &str,
        exclude_user_ids: &[String],
    ) -> Result<User, DbError>;

    async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, DbError>;

    /// Pull requests `user_id` reviews. `NotFound` if the user is unknown.
    async fn reviews_of(&self, user_id: &str) -> Result<Vec<PullRequestShort>, DbError>;

    /// Insert a team and upsert its members. `DuplicateKey` if the name is taken.
    async fn create_team(&self, team: &Team) -> Result<(), DbError>;

    async fn get_team(&self, team_name: &str) -> Result<Team, DbError>;
}

/// Pull requests and the reviewer relation.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Persist a new pull request with its reviewers. `DuplicateKey` on a taken ID.
    async fn create(&self, pr: &PullRequest) -> Result<(), DbError>;

    async fn get_by_id(&self, pr_id: &str) -> Result<PullRequest, DbError>;

    /// Persist status and merge timestamp.
    async fn update(&self, pr: &PullRequest) -> Result<(), DbError>;

    /// Overwrite the reviewer relation of `pr` with `pr.reviewers`.
    ///
    /// Conditional: applies only while `pr` is still open, its stored
    /// reviewers are still `expected_reviewer_ids` and every new reviewer is
    /// still active. `Stale` otherwise, with nothing written.
    async fn replace_reviewers(
        &self,
        pr: &PullRequest,
        expected_reviewer_ids: &[String],
    ) -> Result<(), DbError>;

    /// Deactivate `user_ids` in `team_name` and repair their open reviews,
    /// all or nothing.
    async fn mass_deactivate_and_reassign(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<MassDeactivateResult, DbError>;

    /// Assignment counts per reviewer, busiest first.
    async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>, DbError>;
}

/// [`UserDirectory`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteUserDirectory {
    pool: DbPool,
}

impl SqliteUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn get_by_id(&self, user_id: &str) -> Result<User, DbError> {
        db::users::get_user(&self.pool, user_id).await
    }

    async fn review_candidates(
        &self,
        team_name: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, DbError> {
        db::users::review_candidates(&self.pool, team_name, exclude_user_id, MAX_REVIEWERS).await
    }

    async fn replacement_candidate(
        &self,
        team_name: &str,
        exclude_user_ids: &[String],
    ) -> Result<User, DbError> {
        db::users::replacement_candidate(&self.pool, team_name, exclude_user_ids).await
    }

    async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, DbError> {
        db::users::set_is_active(&self.pool, user_id, is_active).await
    }

    async fn reviews_of(&self, user_id: &str) -> Result<Vec<PullRequestShort>, DbError> {
        db::users::reviews_of(&self.pool, user_id).await
    }

    async fn create_team(&self, team: &Team) -> Result<(), DbError> {
        db::teams::create_team(&self.pool, team).await
    }

    async fn get_team(&self, team_name: &str) -> Result<Team, DbError> {
        db::teams::get_team(&self.pool, team_name).await
    }
}

/// [`PullRequestStore`] backed by SQLite.
#[derive(Clone)]
pub struct SqlitePullRequestStore {
    pool: DbPool,
}

impl SqlitePullRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PullRequestStore for SqlitePullRequestStore {
    async fn create(&self, pr: &PullRequest) -> Result<(), DbError> {
        db::pull_requests::create_pull_request(&self.pool, pr).await
    }

    async fn get_by_id(&self, pr_id: &str) -> Result<PullRequest, DbError> {
        db::pull_requests::get_pull_request(&self.pool, pr_id).await
    }

    async fn update(&self, pr: &PullRequest) -> Result<(), DbError> {
        db::pull_requests::update_status(&self.pool, pr).await
    }

    async fn replace_reviewers(
        &self,
        pr: &PullRequest,
        expected_reviewer_ids: &[String],
    ) -> Result<(), DbError> {
        db::pull_requests::replace_reviewers(&self.pool, pr, expected_reviewer_ids).await
    }

    async fn mass_deactivate_and_reassign(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<MassDeactivateResult, DbError> {
        db::deactivation::mass_deactivate_and_reassign(&self.pool, team_name, user_ids).await
    }

    async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>, DbError> {
        db::stats::reviewer_stats(&self.pool).await
    }
}
