//! Applies control-plane state to the data-plane structures.
//!
//! # Responsibilities
//! - Rebuild the routing table from the full rule list
//! - Keep counter entries and RPS buffers in step with the rules
//! - Recompute readiness for every service whose slices are known, and
//!   forget services whose slices disappeared
//!
//! # Design Decisions
//! - Every apply is a full resync; there are no incremental patches
//! - Only one task calls into the control plane at a time

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::control::state::{ClusterState, ServicePorts};
use crate::counter::RouteCounter;
use crate::readiness::{EndpointSlice, ReadinessCache};
use crate::routing::{PortResolver, RouteRule, RoutingTable};

pub struct ControlPlane {
    routing: Arc<RoutingTable>,
    counter: Arc<RouteCounter>,
    readiness: Arc<ReadinessCache>,
    /// Service keys updated by the previous endpoints apply.
    known_services: Mutex<HashSet<String>>,
}

impl ControlPlane {
    pub fn new(
        routing: Arc<RoutingTable>,
        counter: Arc<RouteCounter>,
        readiness: Arc<ReadinessCache>,
    ) -> Self {
        Self {
            routing,
            counter,
            readiness,
            known_services: Mutex::new(HashSet::new()),
        }
    }

    /// Publish a new routing snapshot and sync the counter to its route set.
    pub fn apply_rules(&self, rules: &[RouteRule], ports: &dyn PortResolver) {
        self.routing.rebuild(rules, ports);

        let mut active = HashSet::with_capacity(rules.len());
        for rule in rules {
            let key = rule.route_key();
            self.counter.ensure(&key);
            let rate = rule
                .scaling_metric
                .as_ref()
                .and_then(|m| m.request_rate.as_ref());
            match rate {
                Some(rate) => self.counter.update_buckets(
                    &key,
                    Duration::from_millis(rate.window_ms),
                    Duration::from_millis(rate.granularity_ms),
                ),
                None => self.counter.clear_buckets(&key),
            }
            active.insert(key);
        }
        self.counter.retain(&active);

        tracing::info!(
            rules = rules.len(),
            entries = self.routing.route_count(),
            "Routing table rebuilt"
        );
    }

    /// Recompute readiness from the full slice list. `services` are keys
    /// known to exist even when they currently have no slices.
    pub fn apply_endpoints(&self, slices: &[EndpointSlice], services: &[String]) {
        let mut grouped: HashMap<String, Vec<EndpointSlice>> = services
            .iter()
            .map(|key| (key.clone(), Vec::new()))
            .collect();
        for slice in slices {
            grouped
                .entry(slice.service_key())
                .or_default()
                .push(slice.clone());
        }

        let mut known = self
            .known_services
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for removed in known.iter().filter(|key| !grouped.contains_key(*key)) {
            tracing::debug!(service = %removed, "Service removed, dropping readiness");
        }
        for (key, slices) in &grouped {
            self.readiness.update(key, slices);
        }
        *known = grouped.into_keys().collect();
        self.readiness.retain(&known);
    }

    /// Apply a complete cluster state: readiness first, then routes, so a
    /// newly routed service is already marked warm if it has endpoints.
    pub fn apply_cluster_state(&self, state: &ClusterState) {
        let services: Vec<String> = state.services.iter().map(|s| s.service_key()).collect();
        self.apply_endpoints(&state.endpoint_slices, &services);

        let ports = ServicePorts::from_services(&state.services);
        self.apply_rules(&state.routes, &ports);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::state::{ServicePort, ServiceSpec};
    use crate::readiness::{Endpoint, EndpointConditions};
    use crate::routing::rule::{RequestRateMetric, ScaleTargetRef, ScalingMetric};
    use axum::http::HeaderMap;

    fn plane() -> (ControlPlane, Arc<RoutingTable>, Arc<RouteCounter>, Arc<ReadinessCache>) {
        let routing = Arc::new(RoutingTable::new());
        let counter = Arc::new(RouteCounter::new());
        let readiness = Arc::new(ReadinessCache::new());
        let plane = ControlPlane::new(routing.clone(), counter.clone(), readiness.clone());
        (plane, routing, counter, readiness)
    }

    fn rule(name: &str, host: &str) -> RouteRule {
        RouteRule {
            name: name.into(),
            hosts: vec![host.into()],
            scale_target: ScaleTargetRef {
                service: "svc".into(),
                port: 0,
                port_name: Some("http".into()),
            },
            ..Default::default()
        }
    }

    fn slice(service: &str) -> EndpointSlice {
        EndpointSlice {
            namespace: "default".into(),
            service_name: service.into(),
            endpoints: vec![Endpoint {
                addresses: vec!["10.0.0.1".into()],
                conditions: EndpointConditions::default(),
            }],
        }
    }

    #[test]
    fn test_apply_cluster_state() {
        let (plane, routing, counter, readiness) = plane();
        let state = ClusterState {
            routes: vec![rule("a", "a.com")],
            services: vec![ServiceSpec {
                name: "svc".into(),
                namespace: String::new(),
                ports: vec![ServicePort { name: "http".into(), port: 8080 }],
            }],
            endpoint_slices: vec![slice("svc")],
        };
        plane.apply_cluster_state(&state);

        let route = routing.route("a.com", "/", &HeaderMap::new()).unwrap();
        assert_eq!(route.authority, "svc.default:8080");
        assert!(routing.has_synced());
        assert_eq!(counter.concurrency("default/a"), Some(0));
        assert!(readiness.is_ready("default/svc"));
    }

    #[test]
    fn test_rules_sync_counter_keys_and_buckets() {
        let (plane, _routing, counter, _readiness) = plane();
        let no_ports = |_: &str, _: &str, _: &str| -> Option<u16> { None };

        let mut rated = rule("a", "a.com");
        rated.scaling_metric = Some(ScalingMetric {
            concurrency: None,
            request_rate: Some(RequestRateMetric {
                target_value: 10,
                window_ms: 10_000,
                granularity_ms: 1_000,
            }),
        });
        plane.apply_rules(&[rated.clone(), rule("b", "b.com")], &no_ports);
        drop(counter.increase("default/a"));
        assert!(counter.snapshot()["default/a"].rps > 0.0);

        // Same rate settings across a rebuild keep the samples
        plane.apply_rules(&[rated], &no_ports);
        assert!(counter.snapshot()["default/a"].rps > 0.0);
        assert_eq!(counter.concurrency("default/b"), None);
    }

    #[test]
    fn test_removed_service_becomes_unready() {
        let (plane, _routing, _counter, readiness) = plane();
        plane.apply_endpoints(&[slice("one"), slice("two")], &[]);
        assert!(readiness.is_ready("default/one"));
        assert!(readiness.is_ready("default/two"));

        plane.apply_endpoints(&[slice("two")], &[]);
        assert!(!readiness.is_ready("default/one"));
        assert!(readiness.is_ready("default/two"));
        assert_eq!(readiness.len(), 1);
    }
}
