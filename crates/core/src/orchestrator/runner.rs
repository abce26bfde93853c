//! Job orchestrator implementation.
//!
//! Drives jobs through the lifecycle state machine:
//! queued → processing → published | queued (backoff retry) | failed.
//! One polling dispatch loop claims due jobs; each claimed job runs as its
//! own task through preprocess → publish fan-out → finalize.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::job::{
    ErrorCode, ErrorDetail, Job, JobFilter, JobPatch, JobStatus, JobStore, JobStoreError,
    PublishRequest,
};
use crate::media::{CompatibilityAdvisor, ConstraintTable, Evaluation, Transcoder};
use crate::publisher::{PublishOutcome, PublishPayload, PublisherRegistry};

use super::config::OrchestratorConfig;
use super::types::{ActiveJob, OrchestratorStatus};

type ClaimedSet = Arc<RwLock<HashMap<String, ActiveJob>>>;

/// The job orchestrator - owns the dispatch loop and the job state machine.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn JobStore>,
    transcoder: Arc<dyn Transcoder>,
    registry: Arc<PublisherRegistry>,
    advisor: CompatibilityAdvisor,
    constraints: Arc<ConstraintTable>,

    // Runtime state
    running: Arc<AtomicBool>,
    claimed: ClaimedSet,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn JobStore>,
        transcoder: Arc<dyn Transcoder>,
        registry: Arc<PublisherRegistry>,
        constraints: Arc<ConstraintTable>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            transcoder,
            registry,
            advisor: CompatibilityAdvisor::new(),
            constraints,
            running: Arc::new(AtomicBool::new(false)),
            claimed: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
        }
    }

    /// Start the orchestrator (recovery sweep + dispatch loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting job orchestrator");

        self.recover_interrupted_jobs();
        self.spawn_dispatch_loop();

        info!("Job orchestrator started");
    }

    /// Stop the orchestrator gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping job orchestrator");

        let _ = self.shutdown_tx.send(());

        // Give in-flight jobs a moment to reach a store write
        tokio::time::sleep(Duration::from_millis(500)).await;

        info!("Job orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let active_jobs = self.claimed.read().await.len();

        let count_of = |status: JobStatus| {
            self.store
                .count(&JobFilter::new().with_status(status))
                .unwrap_or(0) as usize
        };

        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            active_jobs,
            queued_count: count_of(JobStatus::Queued),
            processing_count: count_of(JobStatus::Processing),
            published_count: count_of(JobStatus::Published),
            failed_count: count_of(JobStatus::Failed),
        }
    }

    /// Jobs currently claimed by this process.
    pub async fn active_jobs(&self) -> Vec<ActiveJob> {
        self.claimed.read().await.values().cloned().collect()
    }

    /// Validate and accept a new publish request as a queued job.
    pub fn submit(&self, request: PublishRequest) -> Result<Job, JobStoreError> {
        let job = self.store.create(request)?;
        info!(job_id = %job.id, networks = ?job.request.networks, "Job submitted");
        Ok(job)
    }

    /// Cancel a job that has not reached a terminal state.
    pub fn cancel(&self, id: &str) -> Result<Job, JobStoreError> {
        let job = self
            .store
            .get(id)?
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if !job.status.can_cancel() {
            return Err(JobStoreError::InvalidTransition {
                job_id: id.to_string(),
                current_status: job.status.as_str().to_string(),
                operation: "cancel".to_string(),
            });
        }

        let canceled = self
            .store
            .update_status(id, JobStatus::Canceled, JobPatch::new())?;
        info!(job_id = %id, "Job canceled");
        Ok(canceled)
    }

    /// Manually re-enqueue a terminally failed job.
    ///
    /// `retry_count` is preserved, so the remaining backoff budget continues
    /// where the automatic schedule left off rather than starting over.
    pub fn retry(&self, id: &str) -> Result<Job, JobStoreError> {
        let job = self
            .store
            .get(id)?
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if job.status != JobStatus::Failed {
            return Err(JobStoreError::InvalidTransition {
                job_id: id.to_string(),
                current_status: job.status.as_str().to_string(),
                operation: "retry".to_string(),
            });
        }

        let retried = self.store.update_status(
            id,
            JobStatus::Queued,
            JobPatch::new().with_scheduled_for(None),
        )?;
        info!(job_id = %id, retry_count = retried.retry_count, "Job manually re-enqueued");
        Ok(retried)
    }

    /// Force interrupted jobs back to queued.
    ///
    /// A crash mid-processing must not strand a job in processing forever;
    /// the sweep is idempotent and runs before any dispatch.
    fn recover_interrupted_jobs(&self) {
        match self.store.find_by_status_in(&[JobStatus::Processing]) {
            Ok(jobs) => {
                let mut recovered = 0;
                for job in jobs {
                    match self
                        .store
                        .update_status(&job.id, JobStatus::Queued, JobPatch::new())
                    {
                        Ok(_) => {
                            info!(job_id = %job.id, "Recovered interrupted job");
                            recovered += 1;
                        }
                        Err(e) => {
                            error!(job_id = %job.id, "Failed to recover interrupted job: {}", e)
                        }
                    }
                }
                if recovered > 0 {
                    info!("Recovered {} interrupted jobs", recovered);
                }
            }
            Err(e) => error!("Failed to scan for interrupted jobs: {}", e),
        }
    }

    /// Run one dispatch pass synchronously: claim every due job (up to the
    /// concurrency budget) and process each to completion before returning.
    /// Returns the number of jobs processed.
    pub async fn run_once(&self) -> usize {
        let due = Self::due_jobs(&self.store, &self.config, &self.claimed).await;

        let mut processed = 0;
        for job in due {
            if !Self::claim(&self.claimed, &self.config, &job).await {
                continue;
            }
            Self::execute_job(
                &self.store,
                &self.transcoder,
                &self.registry,
                self.advisor,
                &self.constraints,
                &self.config,
                &job,
            )
            .await;
            Self::release(&self.claimed, &job.id).await;
            processed += 1;
        }
        processed
    }

    /// Spawn the dispatch loop task.
    fn spawn_dispatch_loop(&self) {
        let running = Arc::clone(&self.running);
        let store = Arc::clone(&self.store);
        let transcoder = Arc::clone(&self.transcoder);
        let registry = Arc::clone(&self.registry);
        let advisor = self.advisor;
        let constraints = Arc::clone(&self.constraints);
        let claimed = Arc::clone(&self.claimed);
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Dispatch loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Dispatch loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::dispatch_tick(
                            &store,
                            &transcoder,
                            &registry,
                            advisor,
                            &constraints,
                            &claimed,
                            &config,
                        ).await;
                    }
                }
            }
            info!("Dispatch loop stopped");
        });
    }

    /// One tick of the dispatch loop: claim due jobs and hand each off to its
    /// own task.
    async fn dispatch_tick(
        store: &Arc<dyn JobStore>,
        transcoder: &Arc<dyn Transcoder>,
        registry: &Arc<PublisherRegistry>,
        advisor: CompatibilityAdvisor,
        constraints: &Arc<ConstraintTable>,
        claimed: &ClaimedSet,
        config: &OrchestratorConfig,
    ) {
        let due = Self::due_jobs(store, config, claimed).await;

        for job in due {
            if !Self::claim(claimed, config, &job).await {
                continue;
            }

            let store = Arc::clone(store);
            let transcoder = Arc::clone(transcoder);
            let registry = Arc::clone(registry);
            let constraints = Arc::clone(constraints);
            let claimed = Arc::clone(claimed);
            let config = config.clone();

            tokio::spawn(async move {
                Self::execute_job(
                    &store,
                    &transcoder,
                    &registry,
                    advisor,
                    &constraints,
                    &config,
                    &job,
                )
                .await;
                Self::release(&claimed, &job.id).await;
            });
        }
    }

    /// Due queued jobs up to the free concurrency budget, oldest first.
    async fn due_jobs(
        store: &Arc<dyn JobStore>,
        config: &OrchestratorConfig,
        claimed: &ClaimedSet,
    ) -> Vec<Job> {
        let limit = if config.max_concurrent_jobs == 0 {
            i64::MAX
        } else {
            let in_flight = claimed.read().await.len();
            let free = config.max_concurrent_jobs.saturating_sub(in_flight);
            if free == 0 {
                return Vec::new();
            }
            // Claimed jobs may still show as queued briefly; over-fetch so a
            // full tick's worth of fresh candidates remains after filtering.
            (free + in_flight) as i64
        };

        match store.find_due_queued(Utc::now(), limit) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Failed to query due jobs: {}", e);
                Vec::new()
            }
        }
    }

    /// Atomically claim a job id. Returns false if it is already claimed or
    /// the concurrency budget is spent.
    async fn claim(claimed: &ClaimedSet, config: &OrchestratorConfig, job: &Job) -> bool {
        let mut set = claimed.write().await;
        if set.contains_key(&job.id) {
            return false;
        }
        if config.max_concurrent_jobs > 0 && set.len() >= config.max_concurrent_jobs {
            return false;
        }
        set.insert(
            job.id.clone(),
            ActiveJob {
                job_id: job.id.clone(),
                started_at: Utc::now(),
                networks: job.request.networks.clone(),
            },
        );
        true
    }

    /// Release a claim, success or failure.
    async fn release(claimed: &ClaimedSet, job_id: &str) {
        claimed.write().await.remove(job_id);
    }

    /// Run one claimed job through preprocess, publish fan-out, and finalize.
    async fn execute_job(
        store: &Arc<dyn JobStore>,
        transcoder: &Arc<dyn Transcoder>,
        registry: &Arc<PublisherRegistry>,
        advisor: CompatibilityAdvisor,
        constraints: &Arc<ConstraintTable>,
        config: &OrchestratorConfig,
        job: &Job,
    ) {
        // A failed transition here means the job changed under us (e.g.
        // canceled externally); leave it alone.
        if let Err(e) = store.update_status(
            &job.id,
            JobStatus::Processing,
            JobPatch::new().with_last_attempt(Utc::now()),
        ) {
            debug!(job_id = %job.id, "Skipping job, not claimable: {}", e);
            return;
        }

        info!(job_id = %job.id, attempt = job.retry_count + 1, "Processing job");

        let result = match Self::preprocess(transcoder, advisor, constraints, config, job).await {
            Ok(media_path) => Self::publish_all(registry, job, &media_path).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(published_urls) => {
                info!(job_id = %job.id, "Job published to all networks");
                if let Err(e) = store.update_status(
                    &job.id,
                    JobStatus::Published,
                    JobPatch::new()
                        .with_published_urls(published_urls)
                        .with_error(None),
                ) {
                    error!(job_id = %job.id, "Failed to record publish success: {}", e);
                }
            }
            Err(error) => {
                Self::apply_retry_policy(store, config, job, error);
            }
        }
    }

    /// Per-network preprocessing: probe, evaluate, transcode when needed,
    /// then re-verify against the same network's constraints.
    ///
    /// Networks are visited in request order; later networks see the most
    /// recently produced artifact. Any failure aborts the whole job.
    async fn preprocess(
        transcoder: &Arc<dyn Transcoder>,
        advisor: CompatibilityAdvisor,
        constraints: &Arc<ConstraintTable>,
        config: &OrchestratorConfig,
        job: &Job,
    ) -> Result<PathBuf, ErrorDetail> {
        let mut media = job.request.media_path.clone();
        // Per-job directory so concurrent jobs never collide on artifacts.
        let work_dir = config.work_dir.join(&job.id);

        for (idx, network) in job.request.networks.iter().enumerate() {
            // No constraint entry means the network accepts anything.
            let Some(constraint) = constraints.get(network) else {
                continue;
            };

            let probe = transcoder
                .probe(&media)
                .await
                .map_err(|e| Self::media_error(network, &e))?;

            let eval = advisor.evaluate(&probe, constraint);
            if eval.compliant {
                continue;
            }
            if eval.plan.is_empty() {
                return Err(Self::violation_error(network, &eval));
            }

            let output = work_dir.join(format!("{:02}-{}.mp4", idx, network));
            debug!(job_id = %job.id, network = %network, "Transcoding toward network constraints");
            media = transcoder
                .transcode(&media, &output, &eval.plan)
                .await
                .map_err(|e| Self::media_error(network, &e))?;

            // Unconditional re-check of the fresh artifact. If it still
            // violates this network's constraints the job fails now rather
            // than looping on transcodes.
            let probe = transcoder
                .probe(&media)
                .await
                .map_err(|e| Self::media_error(network, &e))?;
            let recheck = advisor.evaluate(&probe, constraint);
            if !recheck.compliant {
                return Err(Self::violation_error(network, &recheck));
            }
        }

        Ok(media)
    }

    /// Publish to every requested network in request order, never aborting on
    /// a single network's failure. Full success yields the network → url map;
    /// any failure yields the aggregate error.
    async fn publish_all(
        registry: &Arc<PublisherRegistry>,
        job: &Job,
        media_path: &PathBuf,
    ) -> Result<HashMap<String, String>, ErrorDetail> {
        let mut outcomes: Vec<PublishOutcome> = Vec::with_capacity(job.request.networks.len());

        for network in &job.request.networks {
            let payload = PublishPayload {
                media_path: media_path.clone(),
                title: job.request.title.clone(),
                description: job.request.description.clone(),
                network: network.clone(),
            };

            let outcome = match registry.resolve(network) {
                Some(publisher) => publisher.publish(&payload).await,
                None => PublishOutcome::failed(
                    network,
                    ErrorDetail::new(
                        ErrorCode::UnknownError,
                        format!("no publisher configured for network '{}'", network),
                    ),
                ),
            };
            outcomes.push(outcome);
        }

        let failed: Vec<&PublishOutcome> = outcomes.iter().filter(|o| !o.success).collect();
        if failed.is_empty() {
            let urls = outcomes
                .into_iter()
                .map(|o| {
                    let id = o.published_id.unwrap_or_default();
                    (o.network, id)
                })
                .collect();
            return Ok(urls);
        }

        // The aggregate surfaces the first failing network's code/message;
        // details carry every failed network for diagnostics.
        let first = failed[0];
        let first_error = first.error_or_unknown();
        let failed_networks: Vec<&str> = failed.iter().map(|o| o.network.as_str()).collect();
        let errors: Vec<serde_json::Value> = failed
            .iter()
            .map(|o| {
                let e = o.error_or_unknown();
                serde_json::json!({
                    "network": o.network,
                    "code": e.code,
                    "message": e.message,
                })
            })
            .collect();

        Err(ErrorDetail::new(
            first_error.code,
            format!("publish to {} failed: {}", first.network, first_error.message),
        )
        .with_details(serde_json::json!({
            "failed_networks": failed_networks,
            "errors": errors,
        })))
    }

    /// Re-queue with backoff while the retry budget lasts, otherwise fail
    /// terminally. `retry_count` increments on every failure.
    fn apply_retry_policy(
        store: &Arc<dyn JobStore>,
        config: &OrchestratorConfig,
        job: &Job,
        error: ErrorDetail,
    ) {
        let attempt = job.retry_count + 1;

        let result = if (attempt as usize) <= config.retry_delays_secs.len() {
            let delay_secs = config.retry_delays_secs[(attempt - 1) as usize];
            let scheduled_for = Utc::now() + chrono::Duration::seconds(delay_secs as i64);
            warn!(
                job_id = %job.id,
                code = error.code.as_str(),
                retry_count = attempt,
                delay_secs,
                "Job attempt failed, retrying: {}", error.message
            );
            store.update_status(
                &job.id,
                JobStatus::Queued,
                JobPatch::new()
                    .with_retry_count(attempt)
                    .with_scheduled_for(Some(scheduled_for))
                    .with_error(Some(error)),
            )
        } else {
            warn!(
                job_id = %job.id,
                code = error.code.as_str(),
                retry_count = attempt,
                "Job failed terminally after exhausting retries: {}", error.message
            );
            store.update_status(
                &job.id,
                JobStatus::Failed,
                JobPatch::new()
                    .with_retry_count(attempt)
                    .with_error(Some(error)),
            )
        };

        if let Err(e) = result {
            error!(job_id = %job.id, "Failed to record job failure: {}", e);
        }
    }

    fn media_error(network: &str, error: &crate::media::MediaError) -> ErrorDetail {
        ErrorDetail::new(error.error_code(), error.to_string())
            .with_details(serde_json::json!({ "network": network }))
    }

    fn violation_error(network: &str, eval: &Evaluation) -> ErrorDetail {
        let code = eval
            .violations
            .first()
            .map(|v| v.error_code())
            .unwrap_or(ErrorCode::UnknownError);
        ErrorDetail::new(
            code,
            format!("media does not satisfy constraints for network '{}'", network),
        )
        .with_details(serde_json::json!({
            "network": network,
            "violations": eval.violations,
        }))
    }
}
