//! Timeout resolution.
//!
//! # Responsibilities
//! - Pick the readiness-wait budget for a route
//! - Pick the response-header budget for a route
//!
//! # Design Decisions
//! - Per-route overrides always win
//! - A route with a failover waits only as long as its failover allows
//!   before switching over
//! - Timed-out requests return 502, not 504

use std::time::Duration;

use crate::routing::RouteInfo;

/// Budget for the readiness wait: route override, else the failover
/// timeout when one is configured, else the global default.
pub fn condition_wait_timeout(route: &RouteInfo, default: Duration) -> Duration {
    if let Some(t) = route.condition_wait_timeout {
        return t;
    }
    match &route.failover {
        Some(failover) => failover.timeout,
        None => default,
    }
}

/// Budget for receiving response headers from the backend.
pub fn response_header_timeout(route: &RouteInfo, default: Duration) -> Duration {
    route.response_header_timeout.unwrap_or(default)
}
