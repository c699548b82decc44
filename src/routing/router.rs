//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile the full rule set into an immutable `RoutingSnapshot`
//! - Publish snapshots atomically (one `ArcSwap` store per rebuild)
//! - Look up the matching route for a request (host, path, headers)
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Readers take one atomic load and never block, even during a rebuild
//! - O(1) host bucket lookup; O(n) scan over the bucket's pre-sorted entries
//! - Most specific rule wins: longest prefix, then most header matchers,
//!   then insertion order
//! - Exact host > wildcard host (longest suffix first) > catch-all `*`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::HeaderMap;

use crate::routing::matcher::{
    headers_match, normalize_host, normalize_prefix, normalize_request_path, HeaderMatcher,
};
use crate::routing::rule::{RouteRule, DEFAULT_FAILOVER_TIMEOUT_SECS, DEFAULT_PORT};

/// Resolves a named service port to a number.
pub trait PortResolver {
    fn resolve(&self, namespace: &str, service: &str, port_name: &str) -> Option<u16>;
}

impl<F> PortResolver for F
where
    F: Fn(&str, &str, &str) -> Option<u16>,
{
    fn resolve(&self, namespace: &str, service: &str, port_name: &str) -> Option<u16> {
        self(namespace, service, port_name)
    }
}

/// Pre-computed result of a route match. Built once per rebuild and shared
/// by every (host, prefix) entry the rule produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// `namespace/name` of the rule; the counter key.
    pub route_key: String,
    /// `service.namespace:port`.
    pub authority: String,
    /// `namespace/service`; the readiness cache key.
    pub service_key: String,
    /// Readiness-wait override.
    pub condition_wait_timeout: Option<Duration>,
    /// Response-header override.
    pub response_header_timeout: Option<Duration>,
    pub failover: Option<Failover>,
}

impl RouteInfo {
    pub fn has_failover(&self) -> bool {
        self.failover.is_some()
    }
}

/// Failover target of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failover {
    pub authority: String,
    pub timeout: Duration,
}

#[derive(Debug)]
struct RouteEntry {
    path_prefix: String,
    headers: Arc<[HeaderMatcher]>,
    info: Arc<RouteInfo>,
}

/// Immutable compiled routing state. Never mutated once published.
#[derive(Debug, Default)]
pub struct RoutingSnapshot {
    exact: HashMap<String, Vec<RouteEntry>>,
    /// Keyed by the suffix after `*.`.
    wildcard: HashMap<String, Vec<RouteEntry>>,
    catch_all: Vec<RouteEntry>,
    entry_count: usize,
}

impl RoutingSnapshot {
    /// Compile a snapshot from the full rule set.
    pub fn build(rules: &[RouteRule], ports: &dyn PortResolver) -> Self {
        let mut snapshot = RoutingSnapshot::default();

        for rule in rules {
            let namespace = rule.effective_namespace();
            let target = &rule.scale_target;

            let port = resolve_port(
                ports,
                namespace,
                &target.service,
                target.port,
                target.port_name.as_deref(),
            );

            let failover = rule.failover.as_ref().map(|f| {
                let port = resolve_port(ports, namespace, &f.service, f.port, f.port_name.as_deref());
                let secs = if f.timeout_seconds <= 0 {
                    DEFAULT_FAILOVER_TIMEOUT_SECS
                } else {
                    f.timeout_seconds
                };
                Failover {
                    authority: format!("{}.{}:{}", f.service, namespace, port),
                    timeout: Duration::from_secs(secs as u64),
                }
            });

            let (condition_wait_timeout, response_header_timeout) = match &rule.timeouts {
                Some(t) => (non_zero_ms(t.condition_wait_ms), non_zero_ms(t.response_header_ms)),
                None => (None, None),
            };

            let info = Arc::new(RouteInfo {
                route_key: rule.route_key(),
                authority: format!("{}.{}:{}", target.service, namespace, port),
                service_key: format!("{}/{}", namespace, target.service),
                condition_wait_timeout,
                response_header_timeout,
                failover,
            });

            let headers: Arc<[HeaderMatcher]> = rule
                .headers
                .iter()
                .map(|h| HeaderMatcher::new(&h.name, h.value.as_deref()))
                .collect();

            let default_host = ["*".to_string()];
            let hosts: &[String] = if rule.hosts.is_empty() { &default_host } else { &rule.hosts };
            let default_prefix = ["/".to_string()];
            let prefixes: &[String] = if rule.path_prefixes.is_empty() {
                &default_prefix
            } else {
                &rule.path_prefixes
            };

            for host in hosts {
                for prefix in prefixes {
                    let entry = RouteEntry {
                        path_prefix: normalize_prefix(prefix),
                        headers: headers.clone(),
                        info: info.clone(),
                    };
                    snapshot.bucket_mut(host).push(entry);
                    snapshot.entry_count += 1;
                }
            }
        }

        snapshot.for_each_bucket_mut(|entries| {
            // Stable: equal specificity keeps insertion order.
            entries.sort_by(|a, b| {
                b.path_prefix
                    .len()
                    .cmp(&a.path_prefix.len())
                    .then_with(|| b.headers.len().cmp(&a.headers.len()))
            });
        });

        snapshot
    }

    fn bucket_mut(&mut self, host: &str) -> &mut Vec<RouteEntry> {
        let host = host.to_ascii_lowercase();
        if host == "*" {
            return &mut self.catch_all;
        }
        if let Some(suffix) = host.strip_prefix("*.") {
            return self.wildcard.entry(suffix.to_string()).or_default();
        }
        self.exact.entry(host).or_default()
    }

    fn for_each_bucket_mut(&mut self, mut f: impl FnMut(&mut Vec<RouteEntry>)) {
        self.exact.values_mut().for_each(&mut f);
        self.wildcard.values_mut().for_each(&mut f);
        f(&mut self.catch_all);
    }

    /// Number of (host, prefix) entries in this snapshot.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Find the route for a request.
    pub fn lookup(&self, host: &str, path: &str, headers: &HeaderMap) -> Option<&Arc<RouteInfo>> {
        let host = normalize_host(host);
        let path = normalize_request_path(path);

        if let Some(entries) = self.exact.get(host.as_ref()) {
            if let Some(info) = first_match(entries, &path, headers) {
                return Some(info);
            }
        }

        // *.a.example.com, *.example.com, *.com
        for (i, _) in host.match_indices('.') {
            if let Some(entries) = self.wildcard.get(&host[i + 1..]) {
                if let Some(info) = first_match(entries, &path, headers) {
                    return Some(info);
                }
            }
        }

        first_match(&self.catch_all, &path, headers)
    }
}

fn first_match<'a>(entries: &'a [RouteEntry], path: &str, headers: &HeaderMap) -> Option<&'a Arc<RouteInfo>> {
    entries
        .iter()
        .find(|e| path.starts_with(e.path_prefix.as_str()) && headers_match(&e.headers, headers))
        .map(|e| &e.info)
}

fn resolve_port(
    ports: &dyn PortResolver,
    namespace: &str,
    service: &str,
    port: u16,
    port_name: Option<&str>,
) -> u16 {
    if port != 0 {
        return port;
    }
    if let Some(name) = port_name.filter(|n| !n.is_empty()) {
        match ports.resolve(namespace, service, name) {
            Some(p) if p != 0 => return p,
            _ => tracing::warn!(
                namespace = %namespace,
                service = %service,
                port_name = %name,
                "Named port could not be resolved, using default"
            ),
        }
    }
    DEFAULT_PORT
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Lock-free routing table.
///
/// Lookups are a single atomic load of the current snapshot. `rebuild`
/// replaces the snapshot wholesale; it is driven by one control-plane task
/// at a time.
#[derive(Debug, Default)]
pub struct RoutingTable {
    snapshot: ArcSwap<RoutingSnapshot>,
    synced: AtomicBool,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new snapshot from the full rule set and publish it.
    pub fn rebuild(&self, rules: &[RouteRule], ports: &dyn PortResolver) {
        let snapshot = RoutingSnapshot::build(rules, ports);
        tracing::debug!(
            rules = rules.len(),
            entries = snapshot.entry_count(),
            "Routing table rebuilt"
        );
        self.snapshot.store(Arc::new(snapshot));
        self.synced.store(true, Ordering::Release);
    }

    /// Look up the route for a request. Never blocks.
    pub fn route(&self, host: &str, path: &str, headers: &HeaderMap) -> Option<Arc<RouteInfo>> {
        self.snapshot.load().lookup(host, path, headers).cloned()
    }

    /// True once `rebuild` has completed at least once.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Entries in the live snapshot.
    pub fn route_count(&self) -> usize {
        self.snapshot.load().entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::{FailoverRef, HeaderMatch, RouteTimeouts, ScaleTargetRef};
    use axum::http::HeaderValue;

    fn no_ports(_: &str, _: &str, _: &str) -> Option<u16> {
        None
    }

    fn rule(name: &str, hosts: &[&str], prefixes: &[&str], service: &str) -> RouteRule {
        RouteRule {
            name: name.into(),
            hosts: hosts.iter().map(|s| s.to_string()).collect(),
            path_prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            scale_target: ScaleTargetRef {
                service: service.into(),
                port: 8080,
                port_name: None,
            },
            ..Default::default()
        }
    }

    fn table(rules: &[RouteRule]) -> RoutingTable {
        let table = RoutingTable::new();
        table.rebuild(rules, &no_ports);
        table
    }

    fn key(table: &RoutingTable, host: &str, path: &str) -> Option<String> {
        table.route(host, path, &HeaderMap::new()).map(|r| r.route_key.clone())
    }

    #[test]
    fn test_longest_prefix_wins() {
        let t = table(&[
            rule("root", &["x.com"], &["/"], "svc"),
            rule("api", &["x.com"], &["/api/"], "svc"),
        ]);
        assert_eq!(key(&t, "x.com", "/api/v1").as_deref(), Some("default/api"));
        assert_eq!(key(&t, "x.com", "/other").as_deref(), Some("default/root"));
        assert_eq!(key(&t, "x.com", "/api").as_deref(), Some("default/api"));
    }

    #[test]
    fn test_path_segment_boundary() {
        let t = table(&[rule("api", &["x.com"], &["/api"], "svc")]);
        assert!(key(&t, "x.com", "/api/v1").is_some());
        assert!(key(&t, "x.com", "/api2/anything").is_none());
    }

    #[test]
    fn test_wildcard_hosts() {
        let t = table(&[rule("wild", &["*.example.com"], &[], "svc")]);
        assert!(key(&t, "a.example.com", "/").is_some());
        assert!(key(&t, "a.b.example.com", "/").is_some());
        assert!(key(&t, "example.com", "/").is_none());
        assert!(key(&t, "other.com", "/").is_none());
    }

    #[test]
    fn test_host_precedence() {
        let t = table(&[
            rule("all", &["*"], &["/"], "svc"),
            rule("wild", &["*.example.com"], &["/"], "svc"),
            rule("narrow", &["*.a.example.com"], &["/"], "svc"),
            rule("exact", &["a.example.com"], &["/"], "svc"),
        ]);
        assert_eq!(key(&t, "a.example.com", "/").as_deref(), Some("default/exact"));
        assert_eq!(key(&t, "b.a.example.com", "/").as_deref(), Some("default/narrow"));
        assert_eq!(key(&t, "b.example.com", "/").as_deref(), Some("default/wild"));
        assert_eq!(key(&t, "unrelated.org", "/").as_deref(), Some("default/all"));
    }

    #[test]
    fn test_exact_host_falls_through_when_path_misses() {
        let t = table(&[
            rule("exact", &["a.example.com"], &["/only/"], "svc"),
            rule("wild", &["*.example.com"], &["/"], "svc"),
        ]);
        assert_eq!(key(&t, "a.example.com", "/elsewhere").as_deref(), Some("default/wild"));
    }

    #[test]
    fn test_host_port_and_case() {
        let t = table(&[rule("r", &["A.com"], &["/"], "svc")]);
        assert!(key(&t, "a.com:8080", "/x").is_some());
        assert!(key(&t, "A.COM", "/x").is_some());
    }

    #[test]
    fn test_more_headers_win_on_equal_prefix() {
        let mut with_header = rule("canary", &["x.com"], &["/"], "svc");
        with_header.headers = vec![HeaderMatch {
            name: "X-Canary".into(),
            value: Some("1".into()),
        }];
        let t = table(&[rule("plain", &["x.com"], &["/"], "svc"), with_header]);

        let mut headers = HeaderMap::new();
        headers.insert("x-canary", HeaderValue::from_static("1"));
        let matched = t.route("x.com", "/", &headers).unwrap();
        assert_eq!(matched.route_key, "default/canary");

        headers.insert("x-canary", HeaderValue::from_static("0"));
        let matched = t.route("x.com", "/", &headers).unwrap();
        assert_eq!(matched.route_key, "default/plain");
    }

    #[test]
    fn test_equal_specificity_keeps_insertion_order() {
        let t = table(&[
            rule("first", &["x.com"], &["/"], "svc"),
            rule("second", &["x.com"], &["/"], "svc"),
        ]);
        assert_eq!(key(&t, "x.com", "/").as_deref(), Some("default/first"));
    }

    #[test]
    fn test_route_info_resolution() {
        let mut r = rule("app", &["x.com"], &["/"], "web");
        r.namespace = "prod".into();
        r.scale_target.port = 0;
        r.scale_target.port_name = Some("http".into());
        r.failover = Some(FailoverRef {
            service: "fallback".into(),
            port: 0,
            port_name: None,
            timeout_seconds: 0,
        });
        r.timeouts = Some(RouteTimeouts {
            condition_wait_ms: 250,
            response_header_ms: 0,
        });

        let named = |ns: &str, svc: &str, name: &str| {
            (ns == "prod" && svc == "web" && name == "http").then_some(9000u16)
        };
        let t = RoutingTable::new();
        t.rebuild(&[r], &named);

        let info = t.route("x.com", "/", &HeaderMap::new()).unwrap();
        assert_eq!(info.route_key, "prod/app");
        assert_eq!(info.authority, "web.prod:9000");
        assert_eq!(info.service_key, "prod/web");
        assert_eq!(info.condition_wait_timeout, Some(Duration::from_millis(250)));
        assert_eq!(info.response_header_timeout, None);
        let failover = info.failover.as_ref().unwrap();
        assert_eq!(failover.authority, "fallback.prod:80");
        assert_eq!(failover.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unresolved_named_port_defaults_to_80() {
        let mut r = rule("app", &["x.com"], &["/"], "web");
        r.scale_target.port = 0;
        r.scale_target.port_name = Some("missing".into());
        let t = table(&[r]);
        assert_eq!(t.route("x.com", "/", &HeaderMap::new()).unwrap().authority, "web.default:80");
    }

    #[test]
    fn test_has_synced() {
        let t = RoutingTable::new();
        assert!(!t.has_synced());
        assert!(key(&t, "x.com", "/").is_none());
        t.rebuild(&[], &no_ports);
        assert!(t.has_synced());
        assert_eq!(t.route_count(), 0);
    }

    #[test]
    fn test_concurrent_rebuild_is_atomic() {
        let old = vec![rule("old", &["x.com"], &["/"], "old")];
        let mut new_rule = rule("new", &["x.com"], &["/"], "new");
        new_rule.scale_target.port = 9090;
        let new = vec![new_rule];

        let t = Arc::new(table(&old));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let t = t.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let info = t.route("x.com", "/a", &HeaderMap::new()).unwrap();
                        let pair = (info.route_key.as_str(), info.authority.as_str());
                        assert!(
                            pair == ("default/old", "old.default:8080")
                                || pair == ("default/new", "new.default:9090"),
                            "mixed snapshot: {:?}",
                            pair
                        );
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let rules = if i % 2 == 0 { &new } else { &old };
            t.rebuild(rules, &no_ports);
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
