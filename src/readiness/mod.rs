//! Endpoint readiness subsystem.
//!
//! # Data Flow
//! ```text
//! Control plane (endpoint slices changed for a service)
//!     → slice.rs (count addresses of ready, non-terminating endpoints)
//!     → cache.rs (atomic store + generation bump, wakes all waiters)
//!
//! Request pipeline
//!     → cache.rs is_ready()          (fast path, lock-free)
//!     → cache.rs wait_until_ready_or (cold path, parks on generation)
//! ```

pub mod cache;
pub mod slice;

pub use cache::{ReadinessCache, ReadinessError};
pub use slice::{Endpoint, EndpointConditions, EndpointSlice};
