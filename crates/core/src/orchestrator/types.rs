//! Types for the job orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job currently claimed by an in-flight processing task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveJob {
    /// Job id this task belongs to.
    pub job_id: String,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// Networks the job targets.
    pub networks: Vec<String>,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the dispatch loop is running.
    pub running: bool,
    /// Jobs currently claimed and processing in this process.
    pub active_jobs: usize,
    /// Jobs waiting in the queue (including scheduled/backoff).
    pub queued_count: usize,
    /// Jobs marked processing in the store.
    pub processing_count: usize,
    /// Jobs published successfully.
    pub published_count: usize,
    /// Jobs terminally failed.
    pub failed_count: usize,
}
