//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the relaypost server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Job lifecycle metrics
//! - Orchestrator status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use relaypost_core::JobStatus;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "relaypost_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("relaypost_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "relaypost_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs by current status (collected dynamically).
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("relaypost_jobs_by_status", "Current job count by status"),
        &["status"],
    )
    .unwrap()
});

/// Jobs submitted total.
pub static JOBS_SUBMITTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "relaypost_jobs_submitted_total",
        "Total jobs submitted since startup",
    )
    .unwrap()
});

/// Jobs canceled total.
pub static JOBS_CANCELED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "relaypost_jobs_canceled_total",
        "Total jobs canceled since startup",
    )
    .unwrap()
});

/// Manual retries requested total.
pub static JOB_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "relaypost_job_retries_total",
        "Total manual job retries since startup",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "relaypost_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Jobs currently being processed.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "relaypost_jobs_active",
        "Number of jobs currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Jobs
    registry
        .register(Box::new(JOBS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(JOBS_SUBMITTED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(JOBS_CANCELED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(JOB_RETRIES_TOTAL.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(JOBS_ACTIVE.clone())).unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the current orchestrator and
/// store contents.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status().await;

    ORCHESTRATOR_RUNNING.set(if status.running { 1 } else { 0 });
    JOBS_ACTIVE.set(status.active_jobs as i64);

    JOBS_BY_STATUS
        .with_label_values(&[JobStatus::Queued.as_str()])
        .set(status.queued_count as i64);
    JOBS_BY_STATUS
        .with_label_values(&[JobStatus::Processing.as_str()])
        .set(status.processing_count as i64);
    JOBS_BY_STATUS
        .with_label_values(&[JobStatus::Published.as_str()])
        .set(status.published_count as i64);
    JOBS_BY_STATUS
        .with_label_values(&[JobStatus::Failed.as_str()])
        .set(status.failed_count as i64);
}

/// Normalize a request path for metric labels so per-id paths collapse into
/// one label value.
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}
