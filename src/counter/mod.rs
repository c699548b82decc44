//! Admission counting subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted
//!     → route_counter.rs (increase: atomic add + RPS sample)
//!     → CounterGuard held for the request's lifetime
//!     → guard dropped on every exit path (clamped decrement)
//!
//! Autoscaler poll (GET /queue)
//!     → route_counter.rs (snapshot: concurrency + rps.rs window average)
//! ```
//!
//! # Design Decisions
//! - No global lock: one atomic per route, one mutex per route's RPS buffer
//! - Release is idempotent and runs from `Drop`
//! - RPS buffers clear lazily on write; no expiry timers

pub mod route_counter;
pub mod rps;

pub use route_counter::{CounterGuard, RouteCount, RouteCounter};
pub use rps::RpsBuckets;
