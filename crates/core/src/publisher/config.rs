//! Configuration for the aggregator-backed publisher.

use serde::{Deserialize, Serialize};

/// Configuration for the generic aggregator publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Base URL of the aggregator API.
    pub base_url: String,

    /// API key. An empty key means credentials are absent and every publish
    /// fails with a credentials error.
    #[serde(default)]
    pub api_key: String,

    /// Per-upload request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    120
}

impl AggregatorConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout(),
        }
    }
}
