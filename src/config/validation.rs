//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts and header names
//! - Check cluster routes reference a service and use valid host patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    #[error("cold_start.header_name: invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("transport.static_hosts: {host:?} maps to invalid IP {value:?}")]
    InvalidStaticHost { host: String, value: String },
    #[error("observability.log_level: unknown level {0:?}")]
    InvalidLogLevel(String),
    #[error("observability.log_format: unknown format {0:?}")]
    InvalidLogFormat(String),
    #[error("cluster.routes[{index}]: missing name")]
    RouteMissingName { index: usize },
    #[error("route {route}: missing scale_target.service")]
    RouteMissingService { route: String },
    #[error("route {route}: invalid host pattern {host:?}")]
    InvalidHostPattern { route: String, host: String },
    #[error("route {route}: failover is missing a service")]
    FailoverMissingService { route: String },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let t = &config.timeouts;
    let c = &config.cold_start;
    for (field, value) in [
        ("timeouts.connect_ms", t.connect_ms),
        ("timeouts.response_header_ms", t.response_header_ms),
        ("timeouts.condition_wait_ms", t.condition_wait_ms),
        ("cold_start.probe_timeout_ms", c.probe_timeout_ms),
        ("cold_start.probe_attempt_timeout_ms", c.probe_attempt_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field });
        }
    }

    if c.header_enabled && HeaderName::from_bytes(c.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(c.header_name.clone()));
    }

    for (host, value) in &config.transport.static_hosts {
        if value.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidStaticHost {
                host: host.clone(),
                value: value.clone(),
            });
        }
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }
    if !LOG_FORMATS.contains(&obs.log_format.as_str()) {
        errors.push(ValidationError::InvalidLogFormat(obs.log_format.clone()));
    }

    for (index, rule) in config.cluster.routes.iter().enumerate() {
        if rule.name.is_empty() {
            errors.push(ValidationError::RouteMissingName { index });
            continue;
        }
        let route = rule.route_key();
        if rule.scale_target.service.is_empty() {
            errors.push(ValidationError::RouteMissingService { route: route.clone() });
        }
        if rule.failover.as_ref().is_some_and(|f| f.service.is_empty()) {
            errors.push(ValidationError::FailoverMissingService { route: route.clone() });
        }
        for host in &rule.hosts {
            if !valid_host_pattern(host) {
                errors.push(ValidationError::InvalidHostPattern {
                    route: route.clone(),
                    host: host.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// `*`, `*.suffix`, or a hostname without wildcards.
fn valid_host_pattern(host: &str) -> bool {
    if host == "*" {
        return true;
    }
    let name = host.strip_prefix("*.").unwrap_or(host);
    !name.is_empty() && !name.contains('*') && !name.contains('/')
}
