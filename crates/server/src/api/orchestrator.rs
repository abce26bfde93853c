//! Orchestrator API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Orchestrator status response
#[derive(Debug, Serialize)]
pub struct OrchestratorStatusResponse {
    /// Whether the orchestrator is currently running
    pub running: bool,
    /// Number of jobs currently being processed
    pub active_jobs: usize,
    /// Jobs waiting to be dispatched
    pub queued_count: usize,
    /// Jobs currently marked processing in the store
    pub processing_count: usize,
    /// Jobs published successfully (terminal)
    pub published_count: usize,
    /// Jobs failed permanently (terminal)
    pub failed_count: usize,
}

/// One in-flight job
#[derive(Debug, Serialize)]
pub struct ActiveJobResponse {
    pub job_id: String,
    pub started_at: String,
    pub networks: Vec<String>,
}

/// Active jobs response
#[derive(Debug, Serialize)]
pub struct ActiveJobsResponse {
    pub jobs: Vec<ActiveJobResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get orchestrator status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatusResponse> {
    let status = state.orchestrator().status().await;
    Json(OrchestratorStatusResponse {
        running: status.running,
        active_jobs: status.active_jobs,
        queued_count: status.queued_count,
        processing_count: status.processing_count,
        published_count: status.published_count,
        failed_count: status.failed_count,
    })
}

/// List jobs currently being processed
pub async fn active_jobs(State(state): State<Arc<AppState>>) -> Json<ActiveJobsResponse> {
    let jobs = state
        .orchestrator()
        .active_jobs()
        .await
        .into_iter()
        .map(|j| ActiveJobResponse {
            job_id: j.job_id,
            started_at: j.started_at.to_rfc3339(),
            networks: j.networks,
        })
        .collect();
    Json(ActiveJobsResponse { jobs })
}
