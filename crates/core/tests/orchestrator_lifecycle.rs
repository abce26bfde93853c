//! Orchestrator lifecycle integration tests.
//!
//! These tests run the real dispatch loop against the SQLite store and mock
//! capabilities, covering startup recovery, background processing, and
//! graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use relaypost_core::{
    testing::{fixtures, MockPublisher, MockTranscoder},
    JobOrchestrator, JobPatch, JobStatus, JobStore, OrchestratorConfig, PublisherRegistry,
    SqliteJobStore,
};

struct TestHarness {
    store: Arc<dyn JobStore>,
    orchestrator: JobOrchestrator,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn JobStore> =
            Arc::new(SqliteJobStore::new(&temp_dir.path().join("jobs.db")).unwrap());

        let transcoder = Arc::new(MockTranscoder::compliant(1920, 1080, 60.0, 50 * 1024 * 1024));

        let mut registry = PublisherRegistry::new();
        registry.register("youtube", Arc::new(MockPublisher::succeeding("yt")) as _);

        let config = OrchestratorConfig {
            enabled: true,
            poll_interval_ms: 50,
            max_concurrent_jobs: 2,
            retry_delays_secs: vec![0],
            work_dir: temp_dir.path().join("work"),
        };

        let orchestrator = JobOrchestrator::new(
            config,
            Arc::clone(&store),
            transcoder,
            Arc::new(registry),
            Arc::new(fixtures::landscape_only_table("youtube")),
        );

        Self {
            store,
            orchestrator,
            _temp_dir: temp_dir,
        }
    }

    /// Poll the store until the job reaches the given status.
    async fn wait_for_status(&self, id: &str, status: JobStatus) {
        for _ in 0..100 {
            let job = self.store.get(id).unwrap().unwrap();
            if job.status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let job = self.store.get(id).unwrap().unwrap();
        panic!(
            "job {} never reached {:?}, stuck at {:?}",
            id, status, job.status
        );
    }
}

#[tokio::test]
async fn test_background_loop_publishes_submitted_job() {
    let harness = TestHarness::new();
    harness.orchestrator.start().await;

    let job = harness
        .orchestrator
        .submit(fixtures::publish_request(&["youtube"]))
        .unwrap();

    harness.wait_for_status(&job.id, JobStatus::Published).await;

    let published = harness.store.get(&job.id).unwrap().unwrap();
    assert_eq!(
        published.published_urls.unwrap().get("youtube").unwrap(),
        "yt-1"
    );

    harness.orchestrator.stop().await;
    assert!(!harness.orchestrator.status().await.running);
}

#[tokio::test]
async fn test_startup_recovers_interrupted_job() {
    let harness = TestHarness::new();

    // Simulate a crash mid-processing: job stuck in processing with no task.
    let job = harness
        .orchestrator
        .submit(fixtures::publish_request(&["youtube"]))
        .unwrap();
    harness
        .store
        .update_status(&job.id, JobStatus::Processing, JobPatch::new())
        .unwrap();

    // Startup sweeps it back to queued, then the loop picks it up.
    harness.orchestrator.start().await;
    harness.wait_for_status(&job.id, JobStatus::Published).await;

    harness.orchestrator.stop().await;
}

#[tokio::test]
async fn test_stop_halts_dispatch() {
    let harness = TestHarness::new();
    harness.orchestrator.start().await;
    harness.orchestrator.stop().await;

    let job = harness
        .orchestrator
        .submit(fixtures::publish_request(&["youtube"]))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let current = harness.store.get(&job.id).unwrap().unwrap();
    assert_eq!(current.status, JobStatus::Queued);
}
