//! Outbound name resolution.
//!
//! # Responsibilities
//! - Answer from the static host table first
//! - Cache system DNS answers for a fixed TTL
//! - Count cache hits and misses
//! - Plug into the hyper connector as a `tower::Service<Name>`
//!
//! # Design Decisions
//! - One resolver is shared by the forwarding client and the cold-start
//!   probe, so both reach the same addresses
//! - Failed lookups are not cached

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use hyper_util::client::legacy::connect::dns::Name;

use crate::net::transport::TransportStats;
use crate::routing::matcher::strip_port;

#[derive(Debug, Clone)]
struct CachedAddrs {
    ips: Arc<[IpAddr]>,
    expires_at: Instant,
}

#[derive(Debug)]
struct Inner {
    static_hosts: HashMap<String, IpAddr>,
    cache: DashMap<String, CachedAddrs>,
    ttl: Duration,
    stats: Arc<TransportStats>,
}

/// Cheap to clone; all clones share one cache.
#[derive(Debug, Clone)]
pub struct Resolver {
    inner: Arc<Inner>,
}

impl Resolver {
    /// Entries of `static_hosts` whose value is not an IP address are
    /// skipped with a warning.
    pub fn new(
        static_hosts: &HashMap<String, String>,
        ttl: Duration,
        stats: Arc<TransportStats>,
    ) -> Self {
        let static_hosts = static_hosts
            .iter()
            .filter_map(|(host, ip)| match ip.parse::<IpAddr>() {
                Ok(ip) => Some((host.to_ascii_lowercase(), ip)),
                Err(_) => {
                    tracing::warn!(host = %host, value = %ip, "Ignoring static host with invalid IP");
                    None
                }
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                static_hosts,
                cache: DashMap::new(),
                ttl,
                stats,
            }),
        }
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.inner.stats
    }

    /// Resolve a bare host name to IP addresses.
    pub async fn resolve_host(&self, host: &str) -> io::Result<Arc<[IpAddr]>> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(Arc::from([ip]));
        }

        let key = host.to_ascii_lowercase();
        if let Some(ip) = self.inner.static_hosts.get(&key) {
            return Ok(Arc::from([*ip]));
        }

        if let Some(cached) = self.inner.cache.get(&key) {
            if cached.expires_at > Instant::now() {
                self.inner.stats.dns_cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.ips.clone());
            }
        }
        self.inner.stats.dns_cache_misses.fetch_add(1, Ordering::Relaxed);

        let ips: Vec<IpAddr> = tokio::net::lookup_host((key.as_str(), 0))
            .await?
            .map(|addr| addr.ip())
            .collect();
        if ips.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for {}", key),
            ));
        }

        let ips: Arc<[IpAddr]> = Arc::from(ips);
        tracing::debug!(host = %key, addrs = ips.len(), "DNS cache refreshed");
        self.inner.cache.insert(
            key,
            CachedAddrs {
                ips: ips.clone(),
                expires_at: Instant::now() + self.inner.ttl,
            },
        );
        Ok(ips)
    }

    /// Resolve `host[:port]` to socket addresses. The port defaults to 80.
    pub async fn resolve_authority(&self, authority: &str) -> io::Result<Vec<SocketAddr>> {
        let host = strip_port(authority);
        let port = match authority[host.len()..].strip_prefix(':') {
            Some(port) => port.parse::<u16>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid port in {}", authority),
                )
            })?,
            None => 80,
        };
        let ips = self.resolve_host(host).await?;
        Ok(ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect())
    }
}

impl tower::Service<Name> for Resolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = io::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        let resolver = self.clone();
        Box::pin(async move {
            let ips = resolver.resolve_host(name.as_str()).await?;
            // The connector fills in the port.
            let addrs: Vec<SocketAddr> = ips.iter().map(|ip| SocketAddr::new(*ip, 0)).collect();
            Ok(addrs.into_iter())
        })
    }
}
