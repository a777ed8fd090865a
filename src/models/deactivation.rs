//! Bulk deactivation result and the reviewer repair plan.
//!
//! The plan is computed from plain data so every store backend applies the
//! same selection rules inside its own transaction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of a bulk deactivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassDeactivateResult {
    /// Users whose active flag actually flipped.
    pub deactivated_count: u64,

    /// Pull requests that received at least one replacement reviewer.
    pub reassigned_count: u64,
}

/// An open pull request reviewed by at least one deactivated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedPullRequest {
    pub pull_request_id: String,
    pub author_id: String,
    /// All current reviewers, deactivated ones included.
    pub reviewer_ids: Vec<String>,
}

/// A (pull request, reviewer) relation row to insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewerAssignment {
    pub pull_request_id: String,
    pub user_id: String,
}

/// Replacement reviewers for every orphaned slot that could be filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassignmentPlan {
    pub additions: Vec<ReviewerAssignment>,
    pub reassigned_prs: u64,
}

impl ReassignmentPlan {
    /// Fill each slot held by a deactivated reviewer from `pool`.
    ///
    /// A candidate is never the PR's author and never a reviewer the PR
    /// already has. The pool is walked round-robin across PRs; a slot with
    /// no eligible candidate stays empty.
    pub fn build(
        pool: &[String],
        deactivated: &HashSet<String>,
        affected: &[AffectedPullRequest],
    ) -> Self {
        let mut plan = Self::default();
        let mut cursor = 0usize;

        for pr in affected {
            let orphaned = pr
                .reviewer_ids
                .iter()
                .filter(|id| deactivated.contains(*id))
                .count();
            let mut taken: HashSet<&str> = pr
                .reviewer_ids
                .iter()
                .filter(|id| !deactivated.contains(*id))
                .map(String::as_str)
                .collect();

            let mut filled = 0;
            for _ in 0..orphaned {
                let pick = (0..pool.len())
                    .map(|offset| (cursor + offset) % pool.len())
                    .find(|&idx| {
                        let candidate = pool[idx].as_str();
                        candidate != pr.author_id && !taken.contains(candidate)
                    });

                let Some(idx) = pick else { break };
                taken.insert(pool[idx].as_str());
                cursor = idx + 1;
                filled += 1;
                plan.additions.push(ReviewerAssignment {
                    pull_request_id: pr.pull_request_id.clone(),
                    user_id: pool[idx].clone(),
                });
            }

            if filled > 0 {
                plan.reassigned_prs += 1;
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn affected(id: &str, author: &str, reviewers: &[&str]) -> AffectedPullRequest {
        AffectedPullRequest {
            pull_request_id: id.into(),
            author_id: author.into(),
            reviewer_ids: ids(reviewers),
        }
    }

    #[test]
    fn test_replaces_orphaned_slot_skipping_author() {
        let pool = ids(&["u1", "u3"]);
        let gone: HashSet<String> = ids(&["u2"]).into_iter().collect();
        let plan = ReassignmentPlan::build(&pool, &gone, &[affected("pr-1", "u1", &["u2"])]);

        assert_eq!(plan.reassigned_prs, 1);
        assert_eq!(
            plan.additions,
            vec![ReviewerAssignment {
                pull_request_id: "pr-1".into(),
                user_id: "u3".into()
            }]
        );
    }

    #[test]
    fn test_skips_existing_reviewers() {
        let pool = ids(&["u3", "u4"]);
        let gone: HashSet<String> = ids(&["u2"]).into_iter().collect();
        let plan =
            ReassignmentPlan::build(&pool, &gone, &[affected("pr-1", "u1", &["u2", "u3"])]);

        assert_eq!(plan.additions.len(), 1);
        assert_eq!(plan.additions[0].user_id, "u4");
    }

    #[test]
    fn test_two_orphaned_slots_get_two_distinct_replacements() {
        let pool = ids(&["u4", "u5", "u6"]);
        let gone: HashSet<String> = ids(&["u2", "u3"]).into_iter().collect();
        let plan =
            ReassignmentPlan::build(&pool, &gone, &[affected("pr-1", "u1", &["u2", "u3"])]);

        assert_eq!(plan.reassigned_prs, 1);
        assert_eq!(plan.additions.len(), 2);
        assert_ne!(plan.additions[0].user_id, plan.additions[1].user_id);
    }

    #[test]
    fn test_empty_pool_leaves_slots_empty() {
        let gone: HashSet<String> = ids(&["u2"]).into_iter().collect();
        let plan = ReassignmentPlan::build(&[], &gone, &[affected("pr-1", "u1", &["u2"])]);

        assert_eq!(plan, ReassignmentPlan::default());
    }

    #[test]
    fn test_pool_of_only_the_author_fills_nothing() {
        let pool = ids(&["u1"]);
        let gone: HashSet<String> = ids(&["u2"]).into_iter().collect();
        let plan = ReassignmentPlan::build(&pool, &gone, &[affected("pr-1", "u1", &["u2"])]);

        assert_eq!(plan.reassigned_prs, 0);
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn test_round_robin_spreads_load() {
        let pool = ids(&["u4", "u5"]);
        let gone: HashSet<String> = ids(&["u2"]).into_iter().collect();
        let plan = ReassignmentPlan::build(
            &pool,
            &gone,
            &[
                affected("pr-1", "u1", &["u2"]),
                affected("pr-2", "u1", &["u2"]),
            ],
        );

        assert_eq!(plan.reassigned_prs, 2);
        assert_eq!(plan.additions[0].user_id, "u4");
        assert_eq!(plan.additions[1].user_id, "u5");
    }
}
