//! Request and response bodies of the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    MassDeactivateResult, PullRequest, PullRequestShort, PullRequestStatus, ReviewerStat, Team,
    User,
};
use crate::services::Reassignment;

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetIsActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct MassDeactivateRequest {
    pub team_name: String,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_user_id: String,
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

#[derive(Debug, Serialize)]
pub struct MassDeactivateResponse {
    pub deactivated_count: u64,
    pub reassigned_prs: u64,
}

impl From<MassDeactivateResult> for MassDeactivateResponse {
    fn from(result: MassDeactivateResult) -> Self {
        Self {
            deactivated_count: result.deactivated_count,
            reassigned_prs: result.reassigned_count,
        }
    }
}

/// Wire shape of a pull request. Reviewers are listed by ID.
#[derive(Debug, Serialize)]
pub struct PullRequestDto {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PullRequestStatus,
    pub assigned_reviewers: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "mergedAt")]
    pub merged_at: Option<String>,
}

impl From<PullRequest> for PullRequestDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            assigned_reviewers: pr.reviewer_ids(),
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status,
            created_at: rfc3339(pr.created_at),
            merged_at: pr.merged_at.and_then(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestResponse {
    pub pr: PullRequestDto,
}

impl From<PullRequest> for PullRequestResponse {
    fn from(pr: PullRequest) -> Self {
        Self { pr: pr.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct ReassignResponse {
    pub pr: PullRequestDto,
    pub replaced_by: String,
}

impl From<Reassignment> for ReassignResponse {
    fn from(result: Reassignment) -> Self {
        Self {
            pr: result.pull_request.into(),
            replaced_by: result.replaced_by.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: Vec<ReviewerStat>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Unix seconds as RFC 3339, `None` if out of range.
fn rfc3339(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}
