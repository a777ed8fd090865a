//! JSON API routes.
//!
//! Every handler runs its service call under the configured request
//! deadline. Malformed bodies and query strings are answered with
//! `400 BAD_REQUEST` in the common error shape.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::dto::{
    HealthResponse, MassDeactivateRequest, MassDeactivateResponse, MergeRequest,
    PullRequestResponse, ReassignRequest, ReassignResponse, ReviewsResponse, SetIsActiveRequest,
    StatsResponse, TeamQuery, TeamResponse, UserQuery, UserResponse,
};
use super::error::ApiErr;
use super::AppState;
use crate::models::{NewPullRequest, Team};
use crate::services::with_deadline;

// ── Route builders ───────────────────────────────────────────────────────────

pub fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_reviews))
        .route("/users/massDeactivate", post(mass_deactivate))
}

pub fn pull_request_routes() -> Router<AppState> {
    Router::new()
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/pr", get(reviewer_stats))
        .route("/health", get(health))
}

// ── Team handlers ────────────────────────────────────────────────────────────

/// POST /team/add — create a team and upsert its members.
async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let Json(team) = payload?;

    let team = with_deadline(
        state.request_timeout,
        "team/add",
        state.services.teams.create(team),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=X — a team with its members.
async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Query(params) = query?;

    let team = with_deadline(
        state.request_timeout,
        "team/get",
        state.services.teams.get(&params.team_name),
    )
    .await?;

    Ok(Json(team))
}

// ── User handlers ────────────────────────────────────────────────────────────

/// POST /users/setIsActive — flip one user's active flag.
async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let Json(body) = payload?;

    let user = with_deadline(
        state.request_timeout,
        "users/setIsActive",
        state.services.users.set_is_active(&body.user_id, body.is_active),
    )
    .await?;

    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=X — pull requests the user reviews.
async fn get_reviews(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<ReviewsResponse>, ApiErr> {
    let Query(params) = query?;

    let pull_requests = with_deadline(
        state.request_timeout,
        "users/getReview",
        state.services.users.reviews(&params.user_id),
    )
    .await?;

    Ok(Json(ReviewsResponse {
        user_id: params.user_id,
        pull_requests,
    }))
}

/// POST /users/massDeactivate — deactivate users and repair their reviews.
async fn mass_deactivate(
    State(state): State<AppState>,
    payload: Result<Json<MassDeactivateRequest>, JsonRejection>,
) -> Result<Json<MassDeactivateResponse>, ApiErr> {
    let Json(body) = payload?;

    let result = with_deadline(
        state.request_timeout,
        "users/massDeactivate",
        state
            .services
            .deactivation
            .mass_deactivate(&body.team_name, &body.user_ids),
    )
    .await?;

    Ok(Json(result.into()))
}

// ── Pull request handlers ────────────────────────────────────────────────────

/// POST /pullRequest/create — create a pull request with auto-assigned reviewers.
async fn create_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<NewPullRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequestResponse>), ApiErr> {
    let Json(body) = payload?;

    let pr = with_deadline(
        state.request_timeout,
        "pullRequest/create",
        state.services.pull_requests.create(body),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(pr.into())))
}

/// POST /pullRequest/merge — mark merged; repeat calls are no-ops.
async fn merge_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<PullRequestResponse>, ApiErr> {
    let Json(body) = payload?;

    let pr = with_deadline(
        state.request_timeout,
        "pullRequest/merge",
        state.services.pull_requests.merge(&body.pull_request_id),
    )
    .await?;

    Ok(Json(pr.into()))
}

/// POST /pullRequest/reassign — swap one reviewer for another teammate.
async fn reassign_reviewer(
    State(state): State<AppState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<ReassignResponse>, ApiErr> {
    let Json(body) = payload?;

    let result = with_deadline(
        state.request_timeout,
        "pullRequest/reassign",
        state
            .services
            .pull_requests
            .reassign(&body.pull_request_id, &body.old_user_id),
    )
    .await?;

    Ok(Json(result.into()))
}

// ── Analytics ────────────────────────────────────────────────────────────────

/// GET /analytics/pr — review assignment counts per user.
async fn reviewer_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiErr> {
    let stats = with_deadline(
        state.request_timeout,
        "analytics/pr",
        state.services.stats.reviewer_stats(),
    )
    .await?;

    Ok(Json(StatsResponse { stats }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
