//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → pipeline.rs (route → admit → readiness wait → probe → forward)
//!     → request.rs (host extraction, upstream URI rewrite)
//!     → forward.rs (pooled hyper client behind the Forwarder trait)
//!     → response.rs (cold-start header, guard tied to body)
//!     → Send to client
//! ```

pub mod forward;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder, HyperForwarder};
pub use pipeline::{PipelineSettings, ProxyError, RequestPipeline};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
