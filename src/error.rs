//! Application error types.
//!
//! Every failure an engine or service can report is an [`AppError`]. Each
//! variant belongs to one [`ErrorKind`] so the HTTP boundary can pick a
//! status code without string matching.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ValidationFailed,
    ResourceExhausted,
    InvalidInput,
    Timeout,
    Upstream,
}

/// Application-level errors returned by engines and services.
///
/// All variants serialize to a structured JSON object.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Store operation failed for a reason the engine does not classify.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    #[error("team {team_name} already exists")]
    TeamExists { team_name: String },

    #[error("PR {id} already exists")]
    PullRequestExists { id: String },

    /// Reviewer changes are not allowed after merge.
    #[error("cannot reassign on merged PR {id}")]
    PullRequestMerged { id: String },

    /// The user is not a reviewer of the pull request.
    #[error("reviewer {user_id} is not assigned to PR {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// No active user of the team is eligible as a replacement.
    #[error("no active replacement candidate in team {team}")]
    NoCandidate { team: String },

    /// The pull request kept changing underneath a reassignment.
    #[error("PR {id} was modified concurrently, retry the request")]
    ConcurrentUpdate { id: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// The operation did not finish within its deadline.
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },
}

impl AppError {
    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    pub fn pull_request_exists(id: impl Into<String>) -> Self {
        Self::PullRequestExists { id: id.into() }
    }

    pub fn pull_request_merged(id: impl Into<String>) -> Self {
        Self::PullRequestMerged { id: id.into() }
    }

    pub fn not_assigned(pull_request_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pull_request_id: pull_request_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn no_candidate(team: impl Into<String>) -> Self {
        Self::NoCandidate { team: team.into() }
    }

    pub fn concurrent_update(id: impl Into<String>) -> Self {
        Self::ConcurrentUpdate { id: id.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TeamExists { .. }
            | Self::PullRequestExists { .. }
            | Self::PullRequestMerged { .. }
            | Self::ConcurrentUpdate { .. } => ErrorKind::Conflict,
            Self::NotAssigned { .. } => ErrorKind::ValidationFailed,
            Self::NoCandidate { .. } => ErrorKind::ResourceExhausted,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Database { .. } => ErrorKind::Upstream,
        }
    }
}

/// Fails with `InvalidInput` naming `field` when `value` is blank.
pub fn require_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        ));
    }
    Ok(())
}
