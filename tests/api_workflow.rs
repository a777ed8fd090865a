//! End-to-end API workflow tests.
//!
//! Each test drives the full axum router against a fresh SQLite file:
//! 1. Team setup and user activation
//! 2. Pull request creation with auto-assigned reviewers
//! 3. Idempotent merge
//! 4. Single-reviewer reassignment
//! 5. Bulk deactivation with reviewer repair
//! 6. Error codes for every failure the API reports

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pr_reviewer_lib::db;
use pr_reviewer_lib::server::{self, AppState};
use pr_reviewer_lib::services::Services;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

async fn setup_app() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    let pool = db::initialize(&dir.path().join("reviewer.db")).await.unwrap();
    let state = AppState {
        services: Services::sqlite(pool),
        request_timeout: Duration::from_secs(5),
    };
    (dir, server::router(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

/// Create "backend" with the given (user_id, is_active) members.
async fn add_backend_team(app: &Router, members: &[(&str, bool)]) {
    let members: Vec<Value> = members
        .iter()
        .map(|(id, active)| json!({"user_id": id, "username": format!("user-{id}"), "is_active": active}))
        .collect();

    let (status, _) = post(app, "/team/add", json!({"team_name": "backend", "members": members})).await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_pr(app: &Router, id: &str, author: &str) -> Value {
    let (status, body) = post(
        app,
        "/pullRequest/create",
        json!({"pull_request_id": id, "pull_request_name": format!("PR {id}"), "author_id": author}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn reviewers(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body["pr"]["assigned_reviewers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

#[tokio::test]
async fn test_create_assigns_both_teammates() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u1", true), ("u2", true), ("u3", true)]).await;

    let body = create_pr(&app, "pr-100", "u1").await;

    assert_eq!(body["pr"]["status"], "OPEN");
    assert_eq!(body["pr"]["author_id"], "u1");
    assert_eq!(reviewers(&body), vec!["u2", "u3"]);
    assert!(body["pr"]["createdAt"].is_string());
    assert!(body["pr"]["mergedAt"].is_null());
}

#[tokio::test]
async fn test_merge_twice_returns_same_record() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u1", true), ("u2", true)]).await;
    create_pr(&app, "pr-200", "u1").await;

    let (status, first) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "pr-200"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["pr"]["status"], "MERGED");
    assert!(first["pr"]["mergedAt"].is_string());

    let (status, second) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "pr-200"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["pr"]["status"], first["pr"]["status"]);
    assert_eq!(second["pr"]["mergedAt"], first["pr"]["mergedAt"]);
}

#[tokio::test]
async fn test_reassign_picks_remaining_teammate() {
    let (_dir, app) = setup_app().await;
    // u3 starts inactive so pr-300 gets u2 only
    add_backend_team(&app, &[("u1", true), ("u2", true), ("u3", false)]).await;
    let created = create_pr(&app, "pr-300", "u1").await;
    assert_eq!(reviewers(&created), vec!["u2"]);

    let (status, _) = post(&app, "/users/setIsActive", json!({"user_id": "u3", "is_active": true})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-300", "old_user_id": "u2"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["replaced_by"], "u3");
    assert_eq!(reviewers(&body), vec!["u3"]);

    let (_, reviews) = get(&app, "/users/getReview?user_id=u2").await;
    assert_eq!(reviews["pull_requests"], json!([]));
}

#[tokio::test]
async fn test_mass_deactivate_repairs_open_review() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u1", true), ("u2", true), ("u3", false)]).await;
    create_pr(&app, "pr-1", "u1").await;
    post(&app, "/users/setIsActive", json!({"user_id": "u3", "is_active": true})).await;

    let (status, body) = post(
        &app,
        "/users/massDeactivate",
        json!({"team_name": "backend", "user_ids": ["u2"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deactivated_count": 1, "reassigned_prs": 1}));

    let (_, reviews) = get(&app, "/users/getReview?user_id=u3").await;
    assert_eq!(reviews["pull_requests"][0]["pull_request_id"], "pr-1");

    let (_, team) = get(&app, "/team/get?team_name=backend").await;
    let u2 = team["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["user_id"] == "u2")
        .unwrap();
    assert_eq!(u2["is_active"], false);
}

#[tokio::test]
async fn test_team_and_user_lookups() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u2", true), ("u1", true)]).await;

    let (status, team) = get(&app, "/team/get?team_name=backend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(team["team_name"], "backend");
    assert_eq!(team["members"][0]["user_id"], "u1");
    assert_eq!(team["members"][1]["username"], "user-u2");

    let (status, body) = post(&app, "/users/setIsActive", json!({"user_id": "u2", "is_active": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"user": {"user_id": "u2", "username": "user-u2", "is_active": false, "team_name": "backend"}})
    );
}

#[tokio::test]
async fn test_reviewer_stats() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u1", true), ("u2", true)]).await;
    create_pr(&app, "pr-1", "u1").await;
    create_pr(&app, "pr-2", "u1").await;

    let (status, body) = get(&app, "/analytics/pr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"stats": [{"user_id": "u2", "review_count": 2}]}));
}

#[tokio::test]
async fn test_health() {
    let (_dir, app) = setup_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_conflict_error_codes() {
    let (_dir, app) = setup_app().await;
    add_backend_team(&app, &[("u1", true), ("u2", true)]).await;

    let (status, body) = post(&app, "/team/add", json!({"team_name": "backend", "members": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "TEAM_EXISTS");

    create_pr(&app, "pr-1", "u1").await;
    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "again", "author_id": "u1"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "PR_EXISTS");

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": "u1"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NOT_ASSIGNED");

    // u2 is the only teammate besides the author
    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": "u2"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NO_CANDIDATE");

    post(&app, "/pullRequest/merge", json!({"pull_request_id": "pr-1"})).await;
    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": "u2"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "PR_MERGED");
}

#[tokio::test]
async fn test_not_found_error_codes() {
    let (_dir, app) = setup_app().await;

    let (status, body) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "nope"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, _) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "x", "author_id": "ghost"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/team/get?team_name=nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/users/getReview?user_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&app, "/users/setIsActive", json!({"user_id": "ghost", "is_active": true})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_are_bad_request() {
    let (_dir, app) = setup_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/pullRequest/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/pullRequest/merge", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");

    let (status, _) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "", "pull_request_name": "x", "author_id": "u1"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/team/get").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/users/massDeactivate",
        json!({"team_name": "", "user_ids": ["u1"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
