//! Endpoint discovery objects as the control plane delivers them.

use serde::{Deserialize, Serialize};

use crate::routing::rule::DEFAULT_NAMESPACE;

/// One endpoint-discovery object. Several slices may belong to one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSlice {
    pub namespace: String,
    /// Value of the owning service label.
    pub service_name: String,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub addresses: Vec<String>,
    pub conditions: EndpointConditions,
}

/// Unset conditions are treated as "ready" and "not terminating".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConditions {
    pub ready: Option<bool>,
    pub terminating: Option<bool>,
}

impl EndpointConditions {
    pub fn is_serving(&self) -> bool {
        self.ready != Some(false) && self.terminating != Some(true)
    }
}

impl EndpointSlice {
    /// `namespace/service`, the readiness cache key this slice contributes to.
    pub fn service_key(&self) -> String {
        let namespace = if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            self.namespace.as_str()
        };
        format!("{}/{}", namespace, self.service_name)
    }
}

/// Sum of addresses across every serving endpoint in `slices`.
pub fn count_ready(slices: &[EndpointSlice]) -> u64 {
    slices
        .iter()
        .flat_map(|s| s.endpoints.iter())
        .filter(|e| e.conditions.is_serving())
        .map(|e| e.addresses.len() as u64)
        .sum()
}
