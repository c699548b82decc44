//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for a cold backend:
//!     → timeouts.rs (readiness-wait budget: override / failover / default)
//!     → net::probe (TCP connect attempts spaced by backoff.rs)
//!     → timeouts.rs (response-header budget for the forward)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries inside the pipeline; failover is the only recovery
//! - Jittered backoff prevents thundering herd on a waking backend

pub mod backoff;
pub mod timeouts;
