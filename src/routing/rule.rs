//! Routing rule input model.
//!
//! A `RouteRule` is the control plane's view of one scaled HTTP application:
//! which hosts/paths/headers it claims, which service backs it, and the
//! optional failover and timeout overrides. Rules arrive as a full list on
//! every change and are compiled into a `RoutingSnapshot` by
//! [`RoutingTable::rebuild`](crate::routing::RoutingTable::rebuild).

use serde::{Deserialize, Serialize};

/// Namespace assumed when a rule or slice does not carry one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Port used when neither an explicit nor a named port resolves.
pub const DEFAULT_PORT: u16 = 80;

/// Failover wait applied when a failover target does not set one.
pub const DEFAULT_FAILOVER_TIMEOUT_SECS: i64 = 30;

/// One routing rule, as delivered by the control plane.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteRule {
    /// Rule name; `namespace/name` becomes the route key.
    pub name: String,

    /// Rule namespace (empty means `default`).
    pub namespace: String,

    /// Host patterns: exact, `*.suffix`, or `*`. Empty means `*`.
    pub hosts: Vec<String>,

    /// Path prefixes. Empty means `/`.
    pub path_prefixes: Vec<String>,

    /// Header matchers; all must hold for the rule to match.
    pub headers: Vec<HeaderMatch>,

    /// The service to scale and route to.
    pub scale_target: ScaleTargetRef,

    /// Alternate target used when the primary does not become ready in time.
    pub failover: Option<FailoverRef>,

    /// Per-rule timeout overrides.
    pub timeouts: Option<RouteTimeouts>,

    /// Scaling metric; a `request_rate` metric enables RPS tracking.
    pub scaling_metric: Option<ScalingMetric>,
}

impl RouteRule {
    /// The namespace with the default applied.
    pub fn effective_namespace(&self) -> &str {
        if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }

    /// `namespace/name`, the key used for concurrency and RPS accounting.
    pub fn route_key(&self) -> String {
        format!("{}/{}", self.effective_namespace(), self.name)
    }
}

/// Header match condition. Presence-only when `value` is `None`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeaderMatch {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Backend service reference.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScaleTargetRef {
    /// Service name.
    pub service: String,

    /// Numeric port; `0` means "resolve `port_name`, else 80".
    pub port: u16,

    /// Named service port.
    pub port_name: Option<String>,
}

/// Failover target reference.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverRef {
    pub service: String,
    pub port: u16,
    pub port_name: Option<String>,

    /// Seconds to wait for the primary before failing over (<= 0 means 30).
    pub timeout_seconds: i64,
}

/// Per-rule timeout overrides, in milliseconds. `0` keeps the global default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteTimeouts {
    pub condition_wait_ms: u64,
    pub response_header_ms: u64,
}

/// Scaling metric declaration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScalingMetric {
    pub concurrency: Option<ConcurrencyMetric>,
    pub request_rate: Option<RequestRateMetric>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyMetric {
    pub target_value: u32,
}

/// Rate metric; window and granularity are in milliseconds (0 = defaults).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestRateMetric {
    pub target_value: u32,
    pub window_ms: u64,
    pub granularity_ms: u64,
}
