//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request / cold-start probe
//!     → resolver.rs (static hosts → DNS cache → system resolver)
//!     → transport.rs (pooled hyper client, connect + keep-alive settings)
//!     → probe.rs (raw TCP connect with backoff, cold starts only)
//! ```
//!
//! # Design Decisions
//! - One connection pool shared across all routes
//! - Resolution is cached per host with a fixed TTL
//! - Transport counters are plain atomics read by the admin server

pub mod probe;
pub mod resolver;
pub mod transport;

pub use probe::{probe, ProbeSettings};
pub use resolver::Resolver;
pub use transport::{build_client, ProxyClient, TransportStats, TransportStatsSnapshot};
