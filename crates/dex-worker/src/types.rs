//! Core types for the job executor worker.

use serde::{Deserialize, Serialize};

/// Statistics about the worker's operation, surfaced on `/api/stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub animals_created: u64,
    pub errors: u64,
}

/// A recently processed job, for display in the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentJob {
    pub job_id: uuid::Uuid,
    pub outcome: String,
    pub detected_count: usize,
    pub time: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_stats_default() {
        let stats = WorkerStats::default();
        assert_eq!(stats.jobs_completed, 0);
        assert_eq!(stats.jobs_failed, 0);
        assert_eq!(stats.errors, 0);
    }
}
