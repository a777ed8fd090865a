//! Pull request model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::User;

/// Maximum number of reviewers assigned when a pull request is created.
pub const MAX_REVIEWERS: usize = 2;

/// State of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    /// Column value stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl From<&str> for PullRequestStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MERGED" => Self::Merged,
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input for creating a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

/// A pull request with its resolved reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Caller-supplied identity.
    pub pull_request_id: String,

    pub pull_request_name: String,

    /// Author's user ID. Not guaranteed to still exist.
    pub author_id: String,

    pub status: PullRequestStatus,

    /// Creation timestamp (Unix).
    pub created_at: i64,

    /// Merge timestamp (Unix, if merged).
    pub merged_at: Option<i64>,

    /// Assigned reviewers. Never contains the author, never has duplicates.
    pub reviewers: Vec<User>,
}

impl PullRequest {
    /// Check if the pull request is merged.
    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }

    pub fn reviewer_ids(&self) -> Vec<String> {
        self.reviewers.iter().map(|r| r.user_id.clone()).collect()
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.reviewers.iter().any(|r| r.user_id == user_id)
    }

    /// Author plus every current reviewer.
    pub fn exclusion_set(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.reviewers.len() + 1);
        ids.push(self.author_id.clone());
        ids.extend(self.reviewer_ids());
        ids
    }

    /// Swap `old_user_id` for `replacement` in place, keeping the other slots.
    ///
    /// Returns false if `old_user_id` was not a reviewer.
    pub fn replace_reviewer(&mut self, old_user_id: &str, replacement: User) -> bool {
        match self.reviewers.iter_mut().find(|r| r.user_id == old_user_id) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        }
    }
}

/// Pull request row without reviewers.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    pub created_at: i64,
    pub merged_at: Option<i64>,
}

impl PullRequestRow {
    pub fn with_reviewers(self, reviewers: Vec<User>) -> PullRequest {
        PullRequest {
            status: PullRequestStatus::from(self.status.as_str()),
            pull_request_id: self.pull_request_id,
            pull_request_name: self.pull_request_name,
            author_id: self.author_id,
            created_at: self.created_at,
            merged_at: self.merged_at,
            reviewers,
        }
    }
}

/// Summary listing entry for a user's reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
}
