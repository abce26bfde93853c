//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the orchestrator.
    /// When disabled, jobs accumulate in the queue until it is started.
    #[serde(default)]
    pub enabled: bool,

    /// How often the dispatch loop polls for due jobs (milliseconds).
    /// The loop polls rather than listens; the store may be mutated out
    /// of band.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum jobs processing concurrently (0 = unlimited).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Backoff delays in seconds, indexed by retry attempt. A job that has
    /// failed more times than this list is long becomes terminally failed.
    #[serde(default = "default_retry_delays")]
    pub retry_delays_secs: Vec<u64>,

    /// Directory for per-job transcode artifacts.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_max_concurrent() -> usize {
    4
}

fn default_retry_delays() -> Vec<u64> {
    vec![30, 300, 1800] // 30s, 5m, 30m
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("relaypost")
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: default_poll_interval(),
            max_concurrent_jobs: default_max_concurrent(),
            retry_delays_secs: default_retry_delays(),
            work_dir: default_work_dir(),
        }
    }
}
