//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → router.rs (one atomic snapshot load, host bucket lookup)
//!     → matcher.rs (path boundary + header conditions)
//!     → Return: Arc<RouteInfo> or NoMatch
//!
//! Route Compilation (on every control-plane change):
//!     RouteRule[] (rule.rs)
//!     → Resolve ports, timeouts, failover into RouteInfo
//!     → Bucket by host (exact / wildcard suffix / catch-all)
//!     → Sort buckets by specificity
//!     → Publish as immutable RoutingSnapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a rebuild replaces, never patches
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by specificity)

pub mod matcher;
pub mod router;
pub mod rule;

pub use router::{Failover, PortResolver, RouteInfo, RoutingSnapshot, RoutingTable};
pub use rule::RouteRule;
