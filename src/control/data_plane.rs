//! The shared data-plane structures.

use std::sync::Arc;

use crate::control::plane::ControlPlane;
use crate::counter::RouteCounter;
use crate::readiness::ReadinessCache;
use crate::routing::RoutingTable;

/// Handles to the three structures every request touches. Cloning shares them.
#[derive(Debug, Clone, Default)]
pub struct DataPlane {
    pub routing: Arc<RoutingTable>,
    pub counter: Arc<RouteCounter>,
    pub readiness: Arc<ReadinessCache>,
}

impl DataPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// A control plane writing into these structures.
    pub fn control_plane(&self) -> ControlPlane {
        ControlPlane::new(
            self.routing.clone(),
            self.counter.clone(),
            self.readiness.clone(),
        )
    }
}
