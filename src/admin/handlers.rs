use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct DebugStats {
    pub dns_cache_hits: u64,
    pub dns_cache_misses: u64,
    pub requests_forwarded: u64,
    pub forward_errors: u64,
    pub routes: usize,
}

/// Liveness and readiness share one answer: serving once routes are synced.
pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, &'static str) {
    if state.data.routing.has_synced() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}

/// Per-route concurrency and RPS for the autoscaler.
pub async fn get_queue(State(state): State<AdminState>) -> Response {
    match state.data.counter.snapshot_json() {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode queue snapshot");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn get_debug_stats(State(state): State<AdminState>) -> Json<DebugStats> {
    let transport = state.stats.snapshot();
    Json(DebugStats {
        dns_cache_hits: transport.dns_cache_hits,
        dns_cache_misses: transport.dns_cache_misses,
        requests_forwarded: transport.requests_forwarded,
        forward_errors: transport.forward_errors,
        routes: state.data.routing.route_count(),
    })
}
