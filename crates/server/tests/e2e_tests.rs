//! End-to-end tests with mocked external dependencies.
//!
//! These tests run the full server stack in-process with a mock transcoder
//! and mock publishers, driving the orchestrator one pass at a time.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::{FixtureOptions, TestFixture};
use relaypost_core::testing::{MockPublisher, MockTranscoder};
use relaypost_core::ErrorCode;

#[tokio::test]
async fn test_submit_and_publish() {
    let fixture = TestFixture::new().await;
    let id = fixture.submit_job(&["youtube", "tiktok"]).await;

    let processed = fixture.orchestrator.run_once().await;
    assert_eq!(processed, 1);

    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "published");
    assert_eq!(response.body["published_urls"]["youtube"], "yt-1");
    assert_eq!(response.body["published_urls"]["tiktok"], "tt-1");
    assert!(response.body.get("error").is_none());

    assert_eq!(fixture.publisher("youtube").call_count(), 1);
    assert_eq!(fixture.publisher("tiktok").call_count(), 1);
}

#[tokio::test]
async fn test_partial_failure_schedules_retry() {
    let mut options = FixtureOptions::default();
    options.publishers = vec![
        (
            "youtube".to_string(),
            Arc::new(MockPublisher::succeeding("yt")),
        ),
        (
            "tiktok".to_string(),
            Arc::new(MockPublisher::failing(
                ErrorCode::PublisherRejected,
                "rejected by network",
            )),
        ),
    ];
    let fixture = TestFixture::with_options(options).await;
    let id = fixture.submit_job(&["youtube", "tiktok"]).await;

    fixture.orchestrator.run_once().await;

    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.body["status"], "queued");
    assert_eq!(response.body["retry_count"], 1);
    assert_eq!(response.body["error"]["code"], "publisher_rejected");
    assert_eq!(
        response.body["error"]["details"]["failed_networks"],
        json!(["tiktok"])
    );

    // The failure on one network never skips the others
    assert_eq!(fixture.publisher("youtube").call_count(), 1);
    assert_eq!(fixture.publisher("tiktok").call_count(), 1);
}

#[tokio::test]
async fn test_retries_exhaust_to_failed() {
    let mut options = FixtureOptions::default();
    options.publishers = vec![(
        "youtube".to_string(),
        Arc::new(MockPublisher::failing(
            ErrorCode::PublisherNetworkError,
            "connection refused",
        )),
    )];
    options.retry_delays_secs = vec![0, 0];
    let fixture = TestFixture::with_options(options).await;
    let id = fixture.submit_job(&["youtube"]).await;

    // Two retries then terminal failure
    fixture.orchestrator.run_once().await;
    fixture.orchestrator.run_once().await;
    fixture.orchestrator.run_once().await;

    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.body["status"], "failed");
    assert_eq!(response.body["retry_count"], 3);
    assert_eq!(response.body["error"]["code"], "publisher_network_error");

    // Nothing left to dispatch
    assert_eq!(fixture.orchestrator.run_once().await, 0);
}

#[tokio::test]
async fn test_manual_retry_after_exhaustion() {
    let mut options = FixtureOptions::default();
    options.publishers = vec![(
        "youtube".to_string(),
        Arc::new(MockPublisher::failing(
            ErrorCode::UploadFailed,
            "upload failed",
        )),
    )];
    let fixture = TestFixture::with_options(options).await;
    let id = fixture.submit_job(&["youtube"]).await;

    for _ in 0..3 {
        fixture.orchestrator.run_once().await;
    }
    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.body["status"], "failed");

    let response = fixture
        .post(&format!("/api/v1/jobs/{}/retry", id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "queued");
    // Manual retry keeps the accumulated retry count
    assert_eq!(response.body["retry_count"], 3);
}

#[tokio::test]
async fn test_scheduled_job_waits() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({
                "media_path": "/media/clip.mp4",
                "title": "Later",
                "networks": ["youtube"],
                "scheduled_for": "2099-01-01T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    assert_eq!(fixture.orchestrator.run_once().await, 0);
    assert_eq!(fixture.publisher("youtube").call_count(), 0);
}

#[tokio::test]
async fn test_noncompliant_media_is_transcoded_before_publish() {
    let mut options = FixtureOptions::default();
    // 4:3 source against 16:9-only networks; transcoded output probes 16:9.
    options.transcoder = MockTranscoder::compliant(1440, 1080, 60.0, 50 * 1024 * 1024)
        .with_transcode_result(1920, 1080);
    options.publishers = vec![(
        "youtube".to_string(),
        Arc::new(MockPublisher::succeeding("yt")),
    )];
    let fixture = TestFixture::with_options(options).await;
    let id = fixture.submit_job(&["youtube"]).await;

    fixture.orchestrator.run_once().await;

    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.body["status"], "published");
    assert_eq!(fixture.transcoder.transcode_count(), 1);

    // The publisher received the transcoded artifact, not the source
    let published_path = fixture.publisher("youtube").last_media_path().unwrap();
    assert_ne!(published_path.to_str().unwrap(), "/media/clip.mp4");
}

#[tokio::test]
async fn test_probe_failure_fails_job() {
    let mut options = FixtureOptions::default();
    options.transcoder = MockTranscoder::failing_probe();
    let fixture = TestFixture::with_options(options).await;
    let id = fixture.submit_job(&["youtube"]).await;

    for _ in 0..3 {
        fixture.orchestrator.run_once().await;
    }

    let response = fixture.get(&format!("/api/v1/jobs/{}", id)).await;
    assert_eq!(response.body["status"], "failed");
    assert_eq!(response.body["error"]["code"], "probe_error");
    assert_eq!(fixture.publisher("youtube").call_count(), 0);
}

#[tokio::test]
async fn test_status_counts_after_processing() {
    let fixture = TestFixture::new().await;
    fixture.submit_job(&["youtube"]).await;
    fixture.submit_job(&["tiktok"]).await;

    fixture.orchestrator.run_once().await;

    let response = fixture.get("/api/v1/orchestrator/status").await;
    assert_eq!(response.body["published_count"], 2);
    assert_eq!(response.body["queued_count"], 0);
    assert_eq!(response.body["active_jobs"], 0);
}
