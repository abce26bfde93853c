//! Common test utilities for E2E testing with mocks.
//!
//! Builds an in-process server with mock transcoder and publishers injected,
//! so full job lifecycles run without ffmpeg or live network integrations.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use relaypost_core::testing::{MockPublisher, MockTranscoder};
use relaypost_core::{
    AggregatorConfig, AspectRatio, Config, ConstraintTable, DatabaseConfig, JobOrchestrator,
    JobStore, NetworkConstraint, OrchestratorConfig, PublisherRegistry, SqliteJobStore,
};

use relaypost_server::api::create_router;
use relaypost_server::state::AppState;

/// Test fixture wiring the router, the store, and the orchestrator over a
/// temp-dir SQLite database and mock capabilities.
///
/// The dispatch loop is never started; tests drive processing with
/// `fixture.orchestrator.run_once()` for deterministic assertions.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The shared job store
    pub store: Arc<dyn JobStore>,
    /// The orchestrator (dispatch loop not running)
    pub orchestrator: Arc<JobOrchestrator>,
    /// Mock transcoder handle
    pub transcoder: Arc<MockTranscoder>,
    /// Mock publishers by network id
    pub publishers: Vec<(String, Arc<MockPublisher>)>,
    /// Temporary directory backing the database and work dir
    pub temp_dir: TempDir,
}

/// Options for building a fixture
pub struct FixtureOptions {
    pub transcoder: MockTranscoder,
    pub publishers: Vec<(String, Arc<MockPublisher>)>,
    pub constraints: ConstraintTable,
    pub retry_delays_secs: Vec<u64>,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        // 1080p landscape source against two landscape-only networks, so the
        // default path needs no transcoding.
        let mut constraints = ConstraintTable::new();
        for network in ["youtube", "tiktok"] {
            constraints.insert(
                network,
                NetworkConstraint {
                    max_duration_secs: Some(600.0),
                    min_duration_secs: None,
                    max_size_mb: Some(512),
                    supported_ratios: vec![AspectRatio::new(16, 9)],
                    preferred_width: 1920,
                },
            );
        }

        Self {
            transcoder: MockTranscoder::compliant(1920, 1080, 60.0, 50 * 1024 * 1024),
            publishers: vec![
                ("youtube".to_string(), Arc::new(MockPublisher::succeeding("yt"))),
                ("tiktok".to_string(), Arc::new(MockPublisher::succeeding("tt"))),
            ],
            constraints,
            retry_delays_secs: vec![0, 0],
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_options(FixtureOptions::default()).await
    }

    /// Create a test fixture with custom mocks.
    pub async fn with_options(options: FixtureOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            orchestrator: OrchestratorConfig {
                enabled: false,
                retry_delays_secs: options.retry_delays_secs.clone(),
                work_dir: temp_dir.path().join("work"),
                ..Default::default()
            },
            aggregator: Some(AggregatorConfig::new(
                "https://aggregator.test",
                "test-secret",
            )),
            constraints: Some(options.constraints.clone()),
            ..Default::default()
        };

        let store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::new(&db_path).expect("Failed to create job store"),
        );

        let transcoder = Arc::new(options.transcoder);

        let mut registry = PublisherRegistry::new();
        for (network, publisher) in &options.publishers {
            registry.register(network.clone(), Arc::clone(publisher) as _);
        }

        let orchestrator = Arc::new(JobOrchestrator::new(
            config.orchestrator.clone(),
            Arc::clone(&store),
            Arc::clone(&transcoder) as _,
            Arc::new(registry),
            Arc::new(options.constraints),
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store),
            Arc::clone(&orchestrator),
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            orchestrator,
            transcoder,
            publishers: options.publishers,
            temp_dir,
        }
    }

    /// Mock publisher for the given network.
    pub fn publisher(&self, network: &str) -> &Arc<MockPublisher> {
        self.publishers
            .iter()
            .find(|(n, _)| n == network)
            .map(|(_, p)| p)
            .unwrap_or_else(|| panic!("no mock publisher for {}", network))
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                builder.body(Body::from(json.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Submit a job through the API and return its id.
    pub async fn submit_job(&self, networks: &[&str]) -> String {
        let response = self
            .post(
                "/api/v1/jobs",
                serde_json::json!({
                    "media_path": "/media/clip.mp4",
                    "title": "Test clip",
                    "networks": networks,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}
