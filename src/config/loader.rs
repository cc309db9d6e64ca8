//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `network.api_key` (the key the gateway hands out).
pub const API_KEY_ENV_VAR: &str = "CROWDFUND_API_KEY";

/// Overrides `backend.api_url` (the proxied upstream origin).
pub const API_URL_ENV_VAR: &str = "CROWDFUND_API_URL";

/// Overrides `network.cluster`.
pub const CLUSTER_ENV_VAR: &str = "CROWDFUND_CLUSTER";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file at `path` if given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_ENV_VAR) {
        config.network.api_key = Some(key);
    }
    if let Some(url) = lookup(API_URL_ENV_VAR) {
        config.backend.api_url = url;
    }
    if let Some(cluster) = lookup(CLUSTER_ENV_VAR) {
        config.network.cluster = cluster;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (API_KEY_ENV_VAR, "secret"),
            (CLUSTER_ENV_VAR, "mainnet"),
        ]
        .into_iter()
        .collect();

        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.network.api_key.as_deref(), Some("secret"));
        assert_eq!(config.network.cluster, "mainnet");
        assert_eq!(config.backend.api_url, "http://localhost:5000/api");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("crowdfund-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[flow]\nconfirmation_timeout_secs = 0\n").unwrap();

        let result = load_config(&path);
        fs::remove_file(&path).unwrap_or_default();

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("flow.confirmation_timeout_secs"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
