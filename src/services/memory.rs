//! In-memory implementation of the store traits.
//!
//! All state lives behind one `RwLock`, so every write (the bulk
//! deactivation included) is atomic with respect to other callers. Random
//! picks come from a seedable `StdRng`, which makes engine tests
//! deterministic. State is lost on drop.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::RwLock;

use super::store::{PullRequestStore, UserDirectory};
use crate::db::DbError;
use crate::models::{
    AffectedPullRequest, MassDeactivateResult, PullRequest, PullRequestShort, PullRequestStatus,
    ReassignmentPlan, ReviewerStat, Team, TeamMember, User, MAX_REVIEWERS,
};

/// A pull request as held in memory. Reviewers are stored by ID in
/// assignment order and resolved against the user map on read.
#[derive(Debug, Clone)]
struct StoredPullRequest {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: PullRequestStatus,
    created_at: i64,
    merged_at: Option<i64>,
    reviewer_ids: Vec<String>,
}

impl From<&PullRequest> for StoredPullRequest {
    fn from(pr: &PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id.clone(),
            pull_request_name: pr.pull_request_name.clone(),
            author_id: pr.author_id.clone(),
            status: pr.status,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            reviewer_ids: pr.reviewer_ids(),
        }
    }
}

struct MemoryState {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    pull_requests: BTreeMap<String, StoredPullRequest>,
    rng: StdRng,
    writes: u64,
    fail_next_write: bool,
}

impl MemoryState {
    /// Gate every mutation. Must run before any state changes.
    fn begin_write(&mut self) -> Result<(), DbError> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err(DbError::Sqlite(sqlx::Error::Protocol(
                "injected write failure".into(),
            )));
        }
        self.writes += 1;
        Ok(())
    }

    fn resolve(&self, stored: &StoredPullRequest) -> PullRequest {
        PullRequest {
            pull_request_id: stored.pull_request_id.clone(),
            pull_request_name: stored.pull_request_name.clone(),
            author_id: stored.author_id.clone(),
            status: stored.status,
            created_at: stored.created_at,
            merged_at: stored.merged_at,
            reviewers: stored
                .reviewer_ids
                .iter()
                .filter_map(|id| self.users.get(id).cloned())
                .collect(),
        }
    }

    fn active_members(&self, team_name: &str) -> impl Iterator<Item = &User> {
        let team_name = team_name.to_string();
        self.users
            .values()
            .filter(move |u| u.team_name == team_name && u.is_active)
    }
}

/// Store backend holding users, teams and pull requests in memory.
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Backend whose random picks are reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                teams: BTreeSet::new(),
                users: BTreeMap::new(),
                pull_requests: BTreeMap::new(),
                rng,
                writes: 0,
                fail_next_write: false,
            }),
        }
    }

    /// Seed a user (and its team) without counting a write.
    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.write().await;
        state.teams.insert(user.team_name.clone());
        state.users.insert(user.user_id.clone(), user);
    }

    /// Number of successful mutations so far.
    pub async fn write_count(&self) -> u64 {
        self.state.read().await.writes
    }

    /// Make the next mutation fail with an upstream error, leaving state unchanged.
    pub async fn fail_next_write(&self) {
        self.state.write().await.fail_next_write = true;
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryBackend {
    async fn get_by_id(&self, user_id: &str) -> Result<User, DbError> {
        let state = self.state.read().await;
        state.users.get(user_id).cloned().ok_or(DbError::NotFound)
    }

    async fn review_candidates(
        &self,
        team_name: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, DbError> {
        let mut state = self.state.write().await;
        let candidates: Vec<User> = state
            .active_members(team_name)
            .filter(|u| u.user_id != exclude_user_id)
            .cloned()
            .collect();

        Ok(candidates
            .choose_multiple(&mut state.rng, MAX_REVIEWERS)
            .cloned()
            .collect())
    }

    async fn replacement_candidate(
        &self,
        team_name: &str,
        exclude_user_ids: &[String],
    ) -> Result<User, DbError> {
        let mut state = self.state.write().await;
        let candidates: Vec<User> = state
            .active_members(team_name)
            .filter(|u| !exclude_user_ids.contains(&u.user_id))
            .cloned()
            .collect();

        candidates
            .choose(&mut state.rng)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, DbError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(user_id) {
            return Err(DbError::NotFound);
        }
        state.begin_write()?;

        let user = state.users.get_mut(user_id).ok_or(DbError::NotFound)?;
        user.is_active = is_active;
        Ok(user.clone())
    }

    async fn reviews_of(&self, user_id: &str) -> Result<Vec<PullRequestShort>, DbError> {
        let state = self.state.read().await;
        if !state.users.contains_key(user_id) {
            return Err(DbError::NotFound);
        }

        let mut reviews: Vec<(i64, PullRequestShort)> = state
            .pull_requests
            .values()
            .filter(|pr| pr.reviewer_ids.iter().any(|id| id == user_id))
            .map(|pr| {
                (
                    pr.created_at,
                    PullRequestShort {
                        pull_request_id: pr.pull_request_id.clone(),
                        pull_request_name: pr.pull_request_name.clone(),
                        author_id: pr.author_id.clone(),
                        status: pr.status.as_str().to_string(),
                    },
                )
            })
            .collect();

        reviews.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.pull_request_id.cmp(&b.1.pull_request_id))
        });
        Ok(reviews.into_iter().map(|(_, short)| short).collect())
    }

    async fn create_team(&self, team: &Team) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        if state.teams.contains(&team.team_name) {
            return Err(DbError::DuplicateKey);
        }
        state.begin_write()?;

        state.teams.insert(team.team_name.clone());
        for member in &team.members {
            let user = member.clone().into_user(&team.team_name);
            state.users.insert(user.user_id.clone(), user);
        }
        Ok(())
    }

    async fn get_team(&self, team_name: &str) -> Result<Team, DbError> {
        let state = self.state.read().await;
        if !state.teams.contains(team_name) {
            return Err(DbError::NotFound);
        }

        Ok(Team {
            team_name: team_name.to_string(),
            members: state
                .users
                .values()
                .filter(|u| u.team_name == team_name)
                .cloned()
                .map(TeamMember::from)
                .collect(),
        })
    }
}

#[async_trait]
impl PullRequestStore for InMemoryBackend {
    async fn create(&self, pr: &PullRequest) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        if state.pull_requests.contains_key(&pr.pull_request_id) {
            return Err(DbError::DuplicateKey);
        }
        state.begin_write()?;

        state
            .pull_requests
            .insert(pr.pull_request_id.clone(), StoredPullRequest::from(pr));
        Ok(())
    }

    async fn get_by_id(&self, pr_id: &str) -> Result<PullRequest, DbError> {
        let state = self.state.read().await;
        let stored = state.pull_requests.get(pr_id).ok_or(DbError::NotFound)?;
        Ok(state.resolve(stored))
    }

    async fn update(&self, pr: &PullRequest) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        if !state.pull_requests.contains_key(&pr.pull_request_id) {
            return Err(DbError::NotFound);
        }
        state.begin_write()?;

        let stored = state
            .pull_requests
            .get_mut(&pr.pull_request_id)
            .ok_or(DbError::NotFound)?;
        stored.status = pr.status;
        stored.merged_at = pr.merged_at;
        Ok(())
    }

    async fn replace_reviewers(
        &self,
        pr: &PullRequest,
        expected_reviewer_ids: &[String],
    ) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        let stored = state
            .pull_requests
            .get(&pr.pull_request_id)
            .ok_or(DbError::NotFound)?;

        let expected: BTreeSet<&str> = expected_reviewer_ids.iter().map(String::as_str).collect();
        let current: BTreeSet<&str> = stored.reviewer_ids.iter().map(String::as_str).collect();
        let newcomers_active = pr
            .reviewers
            .iter()
            .filter(|r| !expected.contains(r.user_id.as_str()))
            .all(|r| state.users.get(&r.user_id).is_some_and(|u| u.is_active));

        if stored.status != PullRequestStatus::Open || current != expected || !newcomers_active {
            return Err(DbError::Stale);
        }
        state.begin_write()?;

        let stored = state
            .pull_requests
            .get_mut(&pr.pull_request_id)
            .ok_or(DbError::NotFound)?;
        stored.reviewer_ids = pr.reviewer_ids();
        Ok(())
    }

    async fn mass_deactivate_and_reassign(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<MassDeactivateResult, DbError> {
        let mut state = self.state.write().await;

        let requested: BTreeSet<&String> = user_ids.iter().collect();
        let deactivated: Vec<String> = requested
            .into_iter()
            .filter(|id| {
                state
                    .users
                    .get(*id)
                    .is_some_and(|u| u.team_name == team_name && u.is_active)
            })
            .cloned()
            .collect();

        if deactivated.is_empty() {
            return Ok(MassDeactivateResult::default());
        }
        state.begin_write()?;

        for id in &deactivated {
            if let Some(user) = state.users.get_mut(id) {
                user.is_active = false;
            }
        }

        let pool: Vec<String> = state
            .active_members(team_name)
            .map(|u| u.user_id.clone())
            .collect();
        let deactivated_set: HashSet<String> = deactivated.iter().cloned().collect();

        let affected: Vec<AffectedPullRequest> = state
            .pull_requests
            .values()
            .filter(|pr| pr.status == PullRequestStatus::Open)
            .filter(|pr| pr.reviewer_ids.iter().any(|id| deactivated_set.contains(id)))
            .map(|pr| AffectedPullRequest {
                pull_request_id: pr.pull_request_id.clone(),
                author_id: pr.author_id.clone(),
                reviewer_ids: pr.reviewer_ids.clone(),
            })
            .collect();

        let plan = ReassignmentPlan::build(&pool, &deactivated_set, &affected);

        for pr in &affected {
            if let Some(stored) = state.pull_requests.get_mut(&pr.pull_request_id) {
                stored
                    .reviewer_ids
                    .retain(|id| !deactivated_set.contains(id));
            }
        }
        for addition in &plan.additions {
            if let Some(stored) = state.pull_requests.get_mut(&addition.pull_request_id) {
                if !stored.reviewer_ids.contains(&addition.user_id) {
                    stored.reviewer_ids.push(addition.user_id.clone());
                }
            }
        }

        Ok(MassDeactivateResult {
            deactivated_count: deactivated.len() as u64,
            reassigned_count: plan.reassigned_prs,
        })
    }

    async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>, DbError> {
        let state = self.state.read().await;

        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for pr in state.pull_requests.values() {
            for id in &pr.reviewer_ids {
                *counts.entry(id.as_str()).or_default() += 1;
            }
        }

        let mut stats: Vec<ReviewerStat> = counts
            .into_iter()
            .map(|(user_id, review_count)| ReviewerStat {
                user_id: user_id.to_string(),
                review_count,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.review_count
                .cmp(&a.review_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(stats)
    }
}
