//! File-backed cluster state.
//!
//! Stands in for the cluster watch: the config file's `[cluster]` section
//! lists routes, services (for named-port lookups) and endpoint slices, and
//! each reload is treated as a full resync.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::readiness::EndpointSlice;
use crate::routing::rule::DEFAULT_NAMESPACE;
use crate::routing::{PortResolver, RouteRule};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterState {
    pub routes: Vec<RouteRule>,
    pub services: Vec<ServiceSpec>,
    pub endpoint_slices: Vec<EndpointSlice>,
}

/// A service and its named ports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSpec {
    pub name: String,
    pub namespace: String,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
}

impl ServiceSpec {
    /// `namespace/name`, matching [`EndpointSlice::service_key`].
    pub fn service_key(&self) -> String {
        let namespace = if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            self.namespace.as_str()
        };
        format!("{}/{}", namespace, self.name)
    }
}

/// Named-port index over the known services.
#[derive(Debug, Default)]
pub struct ServicePorts {
    ports: HashMap<String, HashMap<String, u16>>,
}

impl ServicePorts {
    pub fn from_services(services: &[ServiceSpec]) -> Self {
        let ports = services
            .iter()
            .map(|svc| {
                let named = svc
                    .ports
                    .iter()
                    .filter(|p| !p.name.is_empty() && p.port != 0)
                    .map(|p| (p.name.clone(), p.port))
                    .collect();
                (svc.service_key(), named)
            })
            .collect();
        Self { ports }
    }
}

impl PortResolver for ServicePorts {
    fn resolve(&self, namespace: &str, service: &str, port_name: &str) -> Option<u16> {
        self.ports
            .get(&format!("{}/{}", namespace, service))
            .and_then(|named| named.get(port_name))
            .copied()
    }
}
