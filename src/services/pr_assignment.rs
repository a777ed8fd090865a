//! Pull request creation, merge and single-reviewer reassignment.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::store::{PullRequestStore, UserDirectory};
use super::upstream;
use crate::db::DbError;
use crate::error::{require_non_empty, AppError};
use crate::models::{NewPullRequest, PullRequest, PullRequestStatus, User, MAX_REVIEWERS};

/// Passes through `try_reassign` before giving up on a busy pull request.
const REASSIGN_ATTEMPTS: usize = 3;

/// Outcome of a successful reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub pull_request: PullRequest,
    pub replaced_by: User,
}

/// Picks reviewers for new pull requests and swaps them out on request.
///
/// Holds no state of its own; exclusions are recomputed from the store on
/// every call.
#[derive(Clone)]
pub struct PrAssignmentEngine {
    users: Arc<dyn UserDirectory>,
    pull_requests: Arc<dyn PullRequestStore>,
}

impl PrAssignmentEngine {
    pub fn new(users: Arc<dyn UserDirectory>, pull_requests: Arc<dyn PullRequestStore>) -> Self {
        Self {
            users,
            pull_requests,
        }
    }

    /// Create an open pull request with up to two reviewers from the
    /// author's team.
    pub async fn create(&self, input: NewPullRequest) -> Result<PullRequest, AppError> {
        require_non_empty(&input.pull_request_id, "pull_request_id")?;
        require_non_empty(&input.author_id, "author_id")?;

        let author = self.author(&input.author_id).await?;

        let mut reviewers = self
            .users
            .review_candidates(&author.team_name, &author.user_id)
            .await
            .map_err(|e| upstream("fetch review candidates", e))?;
        reviewers.retain(|u| u.user_id != author.user_id);
        reviewers.truncate(MAX_REVIEWERS);

        let pr = PullRequest {
            pull_request_id: input.pull_request_id,
            pull_request_name: input.pull_request_name,
            author_id: input.author_id,
            status: PullRequestStatus::Open,
            created_at: Utc::now().timestamp(),
            merged_at: None,
            reviewers,
        };

        self.pull_requests.create(&pr).await.map_err(|e| match e {
            DbError::DuplicateKey => {
                log::warn!("[pr] {} already exists", pr.pull_request_id);
                AppError::pull_request_exists(&pr.pull_request_id)
            }
            other => upstream("create pull request", other),
        })?;

        log::info!(
            "[pr] Created {} by {} with {} reviewer(s)",
            pr.pull_request_id,
            pr.author_id,
            pr.reviewers.len()
        );
        Ok(pr)
    }

    /// Mark a pull request merged. Merging twice returns the stored record
    /// without writing again.
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        require_non_empty(pr_id, "pull_request_id")?;

        let mut pr = self.pull_request(pr_id).await?;
        if pr.is_merged() {
            log::debug!("[pr] {} already merged", pr_id);
            return Ok(pr);
        }

        pr.status = PullRequestStatus::Merged;
        pr.merged_at = Some(Utc::now().timestamp());

        self.pull_requests.update(&pr).await.map_err(|e| match e {
            DbError::NotFound => AppError::not_found_with_id("PullRequest", pr_id),
            other => upstream("merge pull request", other),
        })?;

        log::info!("[pr] Merged {}", pr_id);
        Ok(pr)
    }

    /// Replace `old_user_id` on an open pull request with another active
    /// member of the author's team.
    ///
    /// The write is conditional on the state the checks ran against. If a
    /// merge or bulk deactivation lands in between, the whole sequence runs
    /// again on fresh state, so the outcome is as if the reassignment came
    /// after it.
    pub async fn reassign(&self, pr_id: &str, old_user_id: &str) -> Result<Reassignment, AppError> {
        require_non_empty(pr_id, "pull_request_id")?;
        require_non_empty(old_user_id, "old_user_id")?;

        for attempt in 1..=REASSIGN_ATTEMPTS {
            if let Some(done) = self.try_reassign(pr_id, old_user_id).await? {
                return Ok(done);
            }
            log::debug!(
                "[pr] {} changed during reassignment (attempt {})",
                pr_id,
                attempt
            );
        }

        log::warn!(
            "[pr] Giving up reassigning {} on {} after {} attempts",
            old_user_id,
            pr_id,
            REASSIGN_ATTEMPTS
        );
        Err(AppError::concurrent_update(pr_id))
    }

    /// One read-check-write pass. `None` when the store rejected the write
    /// because the pull request changed after it was read.
    async fn try_reassign(
        &self,
        pr_id: &str,
        old_user_id: &str,
    ) -> Result<Option<Reassignment>, AppError> {
        let mut pr = self.pull_request(pr_id).await?;
        if pr.is_merged() {
            return Err(AppError::pull_request_merged(pr_id));
        }
        if !pr.has_reviewer(old_user_id) {
            log::warn!("[pr] {} is not a reviewer of {}", old_user_id, pr_id);
            return Err(AppError::not_assigned(pr_id, old_user_id));
        }

        let previous = pr.reviewer_ids();
        let exclusions = pr.exclusion_set();
        let author = self.author(&pr.author_id).await?;

        let replacement = self
            .users
            .replacement_candidate(&author.team_name, &exclusions)
            .await
            .map_err(|e| match e {
                DbError::NotFound => {
                    log::warn!("[pr] No replacement candidate in {}", author.team_name);
                    AppError::no_candidate(&author.team_name)
                }
                other => upstream("fetch replacement candidate", other),
            })?;

        pr.replace_reviewer(old_user_id, replacement.clone());

        match self.pull_requests.replace_reviewers(&pr, &previous).await {
            Ok(()) => {}
            Err(DbError::Stale) => return Ok(None),
            Err(DbError::NotFound) => {
                return Err(AppError::not_found_with_id("PullRequest", pr_id));
            }
            Err(other) => return Err(upstream("replace reviewers", other)),
        }

        log::info!(
            "[pr] Reassigned {}: {} -> {}",
            pr_id,
            old_user_id,
            replacement.user_id
        );
        Ok(Some(Reassignment {
            pull_request: pr,
            replaced_by: replacement,
        }))
    }

    async fn author(&self, author_id: &str) -> Result<User, AppError> {
        self.users.get_by_id(author_id).await.map_err(|e| match e {
            DbError::NotFound => {
                log::warn!("[pr] Author {} not found", author_id);
                AppError::not_found_with_id("Author", author_id)
            }
            other => upstream("fetch author", other),
        })
    }

    async fn pull_request(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        self.pull_requests.get_by_id(pr_id).await.map_err(|e| match e {
            DbError::NotFound => AppError::not_found_with_id("PullRequest", pr_id),
            other => upstream("fetch pull request", other),
        })
    }
}
