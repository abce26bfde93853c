//! Job storage trait and query types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{ErrorDetail, Job, JobStatus, PublishRequest};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Job not found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The request failed validation before insertion.
    #[error("invalid publish request: {0}")]
    InvalidRequest(String),

    /// The transition is not allowed from the job's current status.
    #[error("cannot {operation} job {job_id}: current status is {current_status}")]
    InvalidTransition {
        job_id: String,
        current_status: String,
        operation: String,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Filter for querying jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Filter by status.
    pub status: Option<JobStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl JobFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Partial update applied alongside a status change (or on its own).
///
/// `None` fields are left untouched. Nested options distinguish "leave as is"
/// from "clear the column".
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub retry_count: Option<u32>,
    pub scheduled_for: Option<Option<DateTime<Utc>>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub error: Option<Option<ErrorDetail>>,
    pub published_urls: Option<HashMap<String, String>>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn with_scheduled_for(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_last_attempt(mut self, at: DateTime<Utc>) -> Self {
        self.last_attempt = Some(at);
        self
    }

    pub fn with_error(mut self, error: Option<ErrorDetail>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_published_urls(mut self, urls: HashMap<String, String>) -> Self {
        self.published_urls = Some(urls);
        self
    }
}

/// Trait for job storage backends.
///
/// The store is the single source of truth for job state. It guarantees safe
/// concurrent reads and writes; duplicate-dispatch protection is the
/// orchestrator's job, not the store's.
pub trait JobStore: Send + Sync {
    /// Validates and inserts a new job in `Queued` status.
    fn create(&self, request: PublishRequest) -> Result<Job, JobStoreError>;

    /// Gets a job by id.
    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError>;

    /// Lists jobs matching the filter, newest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError>;

    /// Counts jobs matching the filter.
    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError>;

    /// Transitions a job to a new status, applying the patch atomically.
    ///
    /// Rejects transitions out of terminal statuses, with one exception:
    /// `Failed → Queued` (manual retry).
    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        patch: JobPatch,
    ) -> Result<Job, JobStoreError>;

    /// Applies a patch without changing the status.
    fn update(&self, id: &str, patch: JobPatch) -> Result<Job, JobStoreError>;

    /// All jobs whose status is in the given set, oldest first.
    fn find_by_status_in(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, JobStoreError>;

    /// Queued jobs whose `scheduled_for` is absent or ≤ `now`, ordered by
    /// `created_at` ascending (oldest-first fairness).
    fn find_due_queued(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, JobStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builder() {
        let filter = JobFilter::new()
            .with_status(JobStatus::Failed)
            .with_limit(10)
            .with_offset(20);
        assert_eq!(filter.status, Some(JobStatus::Failed));
        assert_eq!(filter.limit, 10);
        assert_eq!(filter.offset, 20);
    }

    #[test]
    fn test_patch_clear_vs_keep() {
        let keep = JobPatch::new();
        assert!(keep.scheduled_for.is_none());

        let clear = JobPatch::new().with_scheduled_for(None);
        assert_eq!(clear.scheduled_for, Some(None));
    }
}
