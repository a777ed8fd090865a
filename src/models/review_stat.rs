//! Reviewer statistics model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of pull requests a user is assigned to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReviewerStat {
    pub user_id: String,
    pub review_count: i64,
}
