//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides, e.g. `GATEWAY_LOG_LEVEL`.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {value:?}")]
    Env { var: String, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, applying environment
/// overrides on top.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    load_from_str(&content, |var| std::env::var(var).ok())
}

/// Defaults plus environment overrides, for running without a config file.
pub fn load_default() -> Result<GatewayConfig, ConfigError> {
    load_from_str("", |var| std::env::var(var).ok())
}

/// Parse, override and validate. `env` looks up a variable by full name.
pub fn load_from_str<F>(content: &str, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overwrite scalar settings from `GATEWAY_*` variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        let var = format!("{}{}", ENV_PREFIX, name);
        env(&var).map(|value| (var, value))
    };

    if let Some((_, v)) = get("LISTENER_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some((_, v)) = get("ADMIN_BIND_ADDRESS") {
        config.admin.bind_address = v;
    }
    if let Some(kv) = get("ADMIN_ENABLED") {
        config.admin.enabled = parse(kv)?;
    }
    if let Some(kv) = get("CONNECT_MS") {
        config.timeouts.connect_ms = parse(kv)?;
    }
    if let Some(kv) = get("KEEP_ALIVE_MS") {
        config.timeouts.keep_alive_ms = parse(kv)?;
    }
    if let Some(kv) = get("RESPONSE_HEADER_MS") {
        config.timeouts.response_header_ms = parse(kv)?;
    }
    if let Some(kv) = get("CONDITION_WAIT_MS") {
        config.timeouts.condition_wait_ms = parse(kv)?;
    }
    if let Some(kv) = get("COLD_START_HEADER_ENABLED") {
        config.cold_start.header_enabled = parse(kv)?;
    }
    if let Some((_, v)) = get("COLD_START_HEADER_NAME") {
        config.cold_start.header_name = v;
    }
    if let Some(kv) = get("DNS_CACHE_TTL_SECS") {
        config.transport.dns_cache_ttl_secs = parse(kv)?;
    }
    if let Some((_, v)) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some((_, v)) = get("LOG_FORMAT") {
        config.observability.log_format = v;
    }
    if let Some(kv) = get("LOG_REQUESTS") {
        config.observability.log_requests = parse(kv)?;
    }
    if let Some(kv) = get("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse(kv)?;
    }
    if let Some((_, v)) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }
    Ok(())
}

fn parse<T: FromStr>((var, value): (String, String)) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let raw = r#"
            [observability]
            log_level = "debug"
        "#;
        let config = load_from_str(
            raw,
            env(&[
                ("GATEWAY_LOG_LEVEL", "warn"),
                ("GATEWAY_CONDITION_WAIT_MS", "250"),
                ("GATEWAY_COLD_START_HEADER_ENABLED", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(config.observability.log_level, "warn");
        assert_eq!(config.timeouts.condition_wait_ms, 250);
        assert!(!config.cold_start.header_enabled);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = load_from_str("", env(&[("GATEWAY_CONNECT_MS", "soon")])).unwrap_err();
        match err {
            ConfigError::Env { var, value } => {
                assert_eq!(var, "GATEWAY_CONNECT_MS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        let err = load_from_str("[listener", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
