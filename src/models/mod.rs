//! Data models for the application.
//!
//! These models represent the core entities stored in the local SQLite database
//! and passed between the store, the engines and the HTTP layer.
//!
//! Row types derive `FromRow` for SQLx queries; everything derives Serialize.

pub mod deactivation;
pub mod pull_request;
pub mod review_stat;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use deactivation::{
    AffectedPullRequest, MassDeactivateResult, ReassignmentPlan, ReviewerAssignment,
};
pub use pull_request::{
    NewPullRequest, PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus,
    MAX_REVIEWERS,
};
pub use review_stat::ReviewerStat;
pub use team::{Team, TeamMember};
pub use user::User;
