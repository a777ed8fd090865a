//! Bulk deactivation of team members.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::store::PullRequestStore;
use super::upstream;
use crate::error::{require_non_empty, AppError};
use crate::models::MassDeactivateResult;

/// Deactivates users in bulk and repairs every open review they held.
///
/// The whole operation is one store transaction: either every listed
/// user is deactivated and every affected pull request repaired, or
/// nothing changes.
#[derive(Clone)]
pub struct DeactivationEngine {
    pull_requests: Arc<dyn PullRequestStore>,
}

impl DeactivationEngine {
    pub fn new(pull_requests: Arc<dyn PullRequestStore>) -> Self {
        Self { pull_requests }
    }

    pub async fn mass_deactivate(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<MassDeactivateResult, AppError> {
        require_non_empty(team_name, "team_name")?;

        let unique: Vec<String> = user_ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        if unique.is_empty() {
            return Ok(MassDeactivateResult::default());
        }

        let result = self
            .pull_requests
            .mass_deactivate_and_reassign(team_name, &unique)
            .await
            .map_err(|e| upstream("mass deactivate", e))?;

        log::info!(
            "[users] Deactivated {} of {} requested in {}, reassigned {} PR(s)",
            result.deactivated_count,
            unique.len(),
            team_name,
            result.reassigned_count
        );
        Ok(result)
    }
}
