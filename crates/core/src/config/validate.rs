use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orchestrator poll interval is not 0
/// - Configured network constraints have a non-zero preferred width
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Orchestrator validation
    if config.orchestrator.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    // Constraint validation. An empty supported_ratios list is allowed; the
    // advisor treats it as "any ratio is acceptable".
    if let Some(constraints) = &config.constraints {
        for (network, constraint) in constraints.iter() {
            if constraint.preferred_width == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "constraints.{}: preferred_width cannot be 0",
                    network
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::media::{ConstraintTable, NetworkConstraint};
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_poll_interval_zero_fails() {
        let mut config = Config::default();
        config.orchestrator.poll_interval_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_size_cap_only_constraint_passes() {
        // No ratio restriction, only a size cap. The advisor accepts any
        // ratio for such a constraint, so validation must too.
        let mut table = ConstraintTable::new();
        table.insert(
            "tiktok",
            NetworkConstraint {
                max_duration_secs: Some(600.0),
                min_duration_secs: None,
                max_size_mb: Some(287),
                supported_ratios: vec![],
                preferred_width: 1080,
            },
        );
        let config = Config {
            constraints: Some(table),
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_preferred_width_fails() {
        let mut table = ConstraintTable::new();
        table.insert(
            "tiktok",
            NetworkConstraint {
                max_duration_secs: None,
                min_duration_secs: None,
                max_size_mb: None,
                supported_ratios: vec![],
                preferred_width: 0,
            },
        );
        let config = Config {
            constraints: Some(table),
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("tiktok"));
    }
}
