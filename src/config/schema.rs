//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::ClusterState;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Proxy listener.
    pub listener: ListenerConfig,

    /// Admin listener (probes, autoscaler queue, debug stats).
    pub admin: AdminConfig,

    /// Global timeout defaults; routes may override some of them.
    pub timeouts: TimeoutConfig,

    /// Cold-start probe and response annotation.
    pub cold_start: ColdStartConfig,

    /// Outbound connection pool and name resolution.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Routes, services and endpoint slices. Re-applied on every reload.
    pub cluster: ClusterState,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Admin server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin endpoints.
    pub enabled: bool,

    /// Admin server bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound TCP connect timeout in milliseconds.
    pub connect_ms: u64,

    /// TCP keep-alive interval for outbound connections in milliseconds.
    pub keep_alive_ms: u64,

    /// Time allowed for the backend to send response headers, in milliseconds.
    pub response_header_ms: u64,

    /// Time a request may wait for its backend to become ready, in milliseconds.
    pub condition_wait_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 500,
            keep_alive_ms: 1_000,
            response_header_ms: 500,
            condition_wait_ms: 20_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn response_header(&self) -> Duration {
        Duration::from_millis(self.response_header_ms)
    }

    pub fn condition_wait(&self) -> Duration {
        Duration::from_millis(self.condition_wait_ms)
    }
}

/// Cold-start configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColdStartConfig {
    /// Mark responses that had to wait for a cold backend.
    pub header_enabled: bool,

    /// Header set to `true` on cold-start responses.
    pub header_name: String,

    /// Overall budget for the TCP probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// Budget for a single connect attempt in milliseconds.
    pub probe_attempt_timeout_ms: u64,

    /// First backoff delay between attempts in milliseconds.
    pub probe_base_delay_ms: u64,
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            header_enabled: true,
            header_name: "x-cold-start".to_string(),
            probe_timeout_ms: 5_000,
            probe_attempt_timeout_ms: 1_000,
            probe_base_delay_ms: 100,
        }
    }
}

/// Outbound transport configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Idle pooled connections kept per backend.
    pub pool_max_idle_per_host: usize,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,

    /// How long resolved addresses are reused, in seconds.
    pub dns_cache_ttl_secs: u64,

    /// Hostname to IP address overrides, consulted before DNS.
    pub static_hosts: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 100,
            pool_idle_timeout_secs: 90,
            dns_cache_ttl_secs: 30,
            static_hosts: HashMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Emit one log line per proxied request.
    pub log_requests: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_requests: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.admin.bind_address, "0.0.0.0:9091");
        assert_eq!(config.timeouts.condition_wait(), Duration::from_secs(20));
        assert_eq!(config.timeouts.response_header(), Duration::from_millis(500));
        assert!(config.cold_start.header_enabled);
        assert_eq!(config.cold_start.header_name, "x-cold-start");
        assert!(config.cluster.routes.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let raw = r#"
            [listener]
            bind_address = "127.0.0.1:8000"

            [timeouts]
            condition_wait_ms = 200

            [transport.static_hosts]
            "svc.default" = "127.0.0.1"

            [[cluster.routes]]
            name = "web"
            hosts = ["a.com"]
            scale_target = { service = "svc", port = 8080 }

            [[cluster.services]]
            name = "svc"
            ports = [{ name = "http", port = 8080 }]

            [[cluster.endpoint_slices]]
            service_name = "svc"
            [[cluster.endpoint_slices.endpoints]]
            addresses = ["10.0.0.1"]
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8000");
        assert_eq!(config.timeouts.condition_wait_ms, 200);
        assert_eq!(config.transport.static_hosts["svc.default"], "127.0.0.1");
        assert_eq!(config.cluster.routes[0].scale_target.port, 8080);
        assert_eq!(config.cluster.services[0].ports[0].port, 8080);
        assert_eq!(config.cluster.endpoint_slices[0].endpoints.len(), 1);
    }
}
