//! Reviewer workload statistics.

use std::sync::Arc;

use super::store::PullRequestStore;
use super::upstream;
use crate::error::AppError;
use crate::models::ReviewerStat;

#[derive(Clone)]
pub struct StatsService {
    pull_requests: Arc<dyn PullRequestStore>,
}

impl StatsService {
    pub fn new(pull_requests: Arc<dyn PullRequestStore>) -> Self {
        Self { pull_requests }
    }

    pub async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>, AppError> {
        self.pull_requests
            .reviewer_stats()
            .await
            .map_err(|e| upstream("reviewer stats", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryBackend;

    #[tokio::test]
    async fn test_empty_stats() {
        let service = StatsService::new(Arc::new(InMemoryBackend::with_seed(1)));
        assert!(service.reviewer_stats().await.unwrap().is_empty());
    }
}
