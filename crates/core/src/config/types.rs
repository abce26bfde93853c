use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::media::{ConstraintTable, TranscoderConfig};
use crate::orchestrator::OrchestratorConfig;
use crate::publisher::AggregatorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    /// Aggregator fallback publisher; absent means no fallback.
    #[serde(default)]
    pub aggregator: Option<AggregatorConfig>,
    /// Per-network constraint table; absent means the built-in defaults.
    #[serde(default)]
    pub constraints: Option<ConstraintTable>,
}

impl Config {
    /// The constraint table in effect: configured or built-in.
    pub fn effective_constraints(&self) -> ConstraintTable {
        self.constraints
            .clone()
            .unwrap_or_else(ConstraintTable::builtin)
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("relaypost.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub orchestrator: OrchestratorConfig,
    pub transcoder: TranscoderConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<SanitizedAggregatorConfig>,
}

/// Aggregator config with the API key reduced to a presence flag
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAggregatorConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            orchestrator: config.orchestrator.clone(),
            transcoder: config.transcoder.clone(),
            aggregator: config
                .aggregator
                .as_ref()
                .map(|a| SanitizedAggregatorConfig {
                    base_url: a.base_url.clone(),
                    api_key_configured: !a.api_key.is_empty(),
                    timeout_secs: a.timeout_secs,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "relaypost.db");
        assert!(!config.orchestrator.enabled);
        assert!(config.aggregator.is_none());
        assert!(config.constraints.is_none());
    }

    #[test]
    fn test_full_config_round_trip() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/jobs.sqlite"

[orchestrator]
enabled = true
retry_delays_secs = [10, 60, 300]

[transcoder]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[aggregator]
base_url = "https://agg.example.com"
api_key = "secret"

[constraints.tiktok]
max_duration_secs = 600.0
supported_ratios = ["9:16"]
preferred_width = 1080
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/jobs.sqlite");
        assert!(config.orchestrator.enabled);
        assert_eq!(config.orchestrator.retry_delays_secs, vec![10, 60, 300]);
        assert_eq!(
            config.aggregator.as_ref().unwrap().base_url,
            "https://agg.example.com"
        );

        // A configured table replaces the builtin one entirely.
        let constraints = config.effective_constraints();
        assert!(constraints.get("tiktok").is_some());
        assert!(constraints.get("youtube").is_none());
    }

    #[test]
    fn test_effective_constraints_falls_back_to_builtin() {
        let constraints = Config::default().effective_constraints();
        assert!(constraints.get("youtube").is_some());
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            aggregator: Some(AggregatorConfig::new("https://agg.example.com", "secret")),
            ..Config::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.aggregator.as_ref().unwrap().api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_sanitized_config_empty_api_key_not_configured() {
        let config = Config {
            aggregator: Some(AggregatorConfig::new("https://agg.example.com", "")),
            ..Config::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(!sanitized.aggregator.unwrap().api_key_configured);
    }
}
