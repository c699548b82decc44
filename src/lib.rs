//! Scale-to-zero HTTP gateway library.

pub mod admin;
pub mod config;
pub mod control;
pub mod counter;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod readiness;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
