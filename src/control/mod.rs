//! Control-plane subsystem.
//!
//! # Data Flow
//! ```text
//! Config load / reload ([cluster] section)
//!     → state.rs (ClusterState: routes, services, endpoint slices)
//!     → plane.rs apply_endpoints (group slices per service → ReadinessCache)
//!     → plane.rs apply_rules (RoutingTable rebuild → RouteCounter sync)
//! ```

pub mod data_plane;
pub mod plane;
pub mod state;

pub use data_plane::DataPlane;
pub use plane::ControlPlane;
pub use state::{ClusterState, ServicePort, ServicePorts, ServiceSpec};
