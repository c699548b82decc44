//! Admin server: probes, autoscaler queue and debug stats.
//!
//! Served on its own listener so probe and scrape traffic never competes
//! with proxied requests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::control::DataPlane;
use crate::net::TransportStats;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub data: DataPlane,
    pub stats: Arc<TransportStats>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/livez", get(get_health))
        .route("/readyz", get(get_health))
        .route("/queue", get(get_queue))
        .route("/debug/stats", get(get_debug_stats))
        .with_state(state)
}
