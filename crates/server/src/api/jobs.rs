//! Job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use relaypost_core::{ErrorDetail, Job, JobFilter, JobStatus, JobStoreError, PublishRequest};

use crate::metrics::{JOBS_CANCELED_TOTAL, JOBS_SUBMITTED_TOTAL, JOB_RETRIES_TOTAL};
use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for job queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Path to the source media file
    pub media_path: PathBuf,
    /// Title of the post
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Target network ids, published in the given order
    pub networks: Vec<String>,
    /// Earliest time the job may run; absent means immediately
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Filter by status
    pub status: Option<String>,
    /// Maximum number of jobs to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for job operations
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub status: String,
    pub media_path: PathBuf,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub networks: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_urls: Option<HashMap<String, String>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status.as_str().to_string(),
            media_path: job.request.media_path,
            title: job.request.title,
            description: job.request.description,
            networks: job.request.networks,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
            scheduled_for: job.scheduled_for.map(|t| t.to_rfc3339()),
            retry_count: job.retry_count,
            last_attempt: job.last_attempt.map(|t| t.to_rfc3339()),
            error: job.error,
            published_urls: job.published_urls,
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<JobErrorResponse>) {
    (
        status,
        Json(JobErrorResponse {
            error: message.into(),
        }),
    )
}

fn store_error_response(e: JobStoreError) -> (StatusCode, Json<JobErrorResponse>) {
    let status = match &e {
        JobStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        JobStoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        JobStoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        JobStoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a new publish job
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobResponse>), impl IntoResponse> {
    let request = PublishRequest {
        media_path: body.media_path,
        title: body.title,
        description: body.description,
        networks: body.networks,
        scheduled_for: body.scheduled_for,
    };

    match state.orchestrator().submit(request) {
        Ok(job) => {
            JOBS_SUBMITTED_TOTAL.inc();
            Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
        }
        Err(e) => Err(store_error_response(e)),
    }
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, impl IntoResponse> {
    match state.store().get(&id) {
        Ok(Some(job)) => Ok(Json(JobResponse::from(job))),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", id),
        )),
        Err(e) => Err(store_error_response(e)),
    }
}

/// List jobs with optional filters
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = JobFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        match JobStatus::parse(status) {
            Some(status) => filter = filter.with_status(status),
            None => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Unknown status: {}", status),
                ));
            }
        }
    }

    let jobs = match state.store().list(&filter) {
        Ok(jobs) => jobs,
        Err(e) => return Err(store_error_response(e)),
    };

    // Total count ignores pagination
    let count_filter = JobFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter
    };

    let total = match state.store().count(&count_filter) {
        Ok(count) => count,
        Err(e) => return Err(store_error_response(e)),
    };

    Ok(Json(ListJobsResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Cancel a job (DELETE endpoint)
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, impl IntoResponse> {
    match state.orchestrator().cancel(&id) {
        Ok(job) => {
            JOBS_CANCELED_TOTAL.inc();
            Ok(Json(JobResponse::from(job)))
        }
        Err(e) => Err(store_error_response(e)),
    }
}

/// Re-queue a failed job
pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, impl IntoResponse> {
    match state.orchestrator().retry(&id) {
        Ok(job) => {
            JOB_RETRIES_TOTAL.inc();
            Ok(Json(JobResponse::from(job)))
        }
        Err(e) => Err(store_error_response(e)),
    }
}
