//! Shared outbound transport.
//!
//! One pooled client serves every route. Connections resolve through the
//! gateway's [`Resolver`] so static hosts and the DNS cache apply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;

use crate::config::{TimeoutConfig, TransportConfig};
use crate::net::resolver::Resolver;

pub type ProxyClient = Client<HttpConnector<Resolver>, Body>;

/// Transport counters surfaced on `/debug/stats`.
#[derive(Debug, Default)]
pub struct TransportStats {
    pub dns_cache_hits: AtomicU64,
    pub dns_cache_misses: AtomicU64,
    pub requests_forwarded: AtomicU64,
    pub forward_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportStatsSnapshot {
    pub dns_cache_hits: u64,
    pub dns_cache_misses: u64,
    pub requests_forwarded: u64,
    pub forward_errors: u64,
}

impl TransportStats {
    pub fn snapshot(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            dns_cache_hits: self.dns_cache_hits.load(Ordering::Relaxed),
            dns_cache_misses: self.dns_cache_misses.load(Ordering::Relaxed),
            requests_forwarded: self.requests_forwarded.load(Ordering::Relaxed),
            forward_errors: self.forward_errors.load(Ordering::Relaxed),
        }
    }
}

/// Build the pooled HTTP/1.1 client used for forwarding.
pub fn build_client(
    transport: &TransportConfig,
    timeouts: &TimeoutConfig,
    resolver: Resolver,
) -> ProxyClient {
    let mut connector = HttpConnector::new_with_resolver(resolver);
    connector.set_connect_timeout(Some(timeouts.connect()));
    connector.set_keepalive(Some(timeouts.keep_alive()));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(transport.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(transport.pool_idle_timeout_secs))
        .build(connector)
}
