//! Per-request state machine.
//!
//! # Data Flow
//! ```text
//! Route → Admit → ReadinessWait → [ColdStartProbe] → Forward → Record
//!   │        │          │                 │              │
//!  404    guard held   502 / failover    502            502
//!                      503 on shutdown
//! ```
//!
//! # Design Decisions
//! - No retries; failover is the only recovery
//! - The admission guard is released on every exit path, including when
//!   the client disconnects and this future is dropped
//! - Every outcome is recorded exactly once, in `handle`

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::control::DataPlane;
use crate::http::forward::{ForwardError, Forwarder};
use crate::http::request::{prepare_upstream, request_host, request_id};
use crate::http::response::{hold_until_body_done, mark_cold_start, plain};
use crate::lifecycle::Shutdown;
use crate::net::{probe, ProbeSettings, Resolver, TransportStats};
use crate::observability::metrics;
use crate::readiness::ReadinessError;
use crate::resilience::timeouts;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route for host {host:?}")]
    RouteNotFound { host: String },
    #[error("service {service} not ready within {waited:?}")]
    ReadinessTimeout { service: String, waited: Duration },
    #[error("cold-start probe to {authority} failed: {source}")]
    ColdStartProbeFailed {
        authority: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Forwarding(#[from] ForwardError),
    #[error("gateway is shutting down")]
    Cancelled,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::ReadinessTimeout { .. }
            | ProxyError::ColdStartProbeFailed { .. }
            | ProxyError::Forwarding(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        plain(self.status_code())
    }
}

/// Settings read from config once at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub condition_wait: Duration,
    pub response_header: Duration,
    /// `None` disables the cold-start annotation.
    pub cold_start_header: Option<HeaderName>,
    pub probe: ProbeSettings,
    pub log_requests: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let cold_start_header = if config.cold_start.header_enabled {
            HeaderName::from_bytes(config.cold_start.header_name.as_bytes())
                .map_err(|_| {
                    tracing::warn!(
                        header = %config.cold_start.header_name,
                        "Invalid cold-start header name, annotation disabled"
                    );
                })
                .ok()
        } else {
            None
        };
        Self {
            condition_wait: config.timeouts.condition_wait(),
            response_header: config.timeouts.response_header(),
            cold_start_header,
            probe: ProbeSettings::from(&config.cold_start),
            log_requests: config.observability.log_requests,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

pub struct RequestPipeline {
    data: DataPlane,
    resolver: Resolver,
    forwarder: Arc<dyn Forwarder>,
    stats: Arc<TransportStats>,
    shutdown: Shutdown,
    settings: PipelineSettings,
}

impl RequestPipeline {
    pub fn new(
        data: DataPlane,
        resolver: Resolver,
        forwarder: Arc<dyn Forwarder>,
        shutdown: Shutdown,
        settings: PipelineSettings,
    ) -> Self {
        let stats = resolver.stats().clone();
        Self {
            data,
            resolver,
            forwarder,
            stats,
            shutdown,
            settings,
        }
    }

    /// Run one request through the pipeline. Never fails: every error is
    /// turned into a response here.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let host = request_host(&request).unwrap_or_default().to_string();
        let request_id = request_id(&request).to_string();

        let response = match self.process(request, &host).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ProxyError::RouteNotFound { .. } => {
                        tracing::debug!(request_id = %request_id, host = %host, path = %path, "No route matched");
                    }
                    ProxyError::Cancelled => {
                        tracing::info!(request_id = %request_id, host = %host, "Readiness wait cancelled by shutdown");
                    }
                    _ => {
                        tracing::warn!(request_id = %request_id, host = %host, path = %path, error = %e, "Request failed");
                    }
                }
                e.into_response()
            }
        };

        let status = response.status();
        metrics::record_request(method.as_str(), &path, status.as_u16(), &host, start);
        if self.settings.log_requests {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                host = %host,
                path = %path,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
        }
        response
    }

    async fn process(&self, request: Request<Body>, host: &str) -> Result<Response<Body>, ProxyError> {
        let route = self
            .data
            .routing
            .route(host, request.uri().path(), request.headers())
            .ok_or_else(|| ProxyError::RouteNotFound { host: host.to_string() })?;

        let guard = self.data.counter.increase(&route.route_key);

        let wait = timeouts::condition_wait_timeout(&route, self.settings.condition_wait);
        let outcome = self
            .data
            .readiness
            .wait_until_ready_or(&route.service_key, wait, self.shutdown.wait())
            .await;
        let (authority, cold_start) = match outcome {
            Ok(cold_start) => (route.authority.as_str(), cold_start),
            Err(ReadinessError::Timeout) => {
                metrics::record_readiness_timeout(&route.route_key);
                match &route.failover {
                    Some(failover) => {
                        tracing::info!(
                            route = %route.route_key,
                            failover = %failover.authority,
                            waited = ?wait,
                            "Primary not ready, failing over"
                        );
                        (failover.authority.as_str(), true)
                    }
                    None => {
                        return Err(ProxyError::ReadinessTimeout {
                            service: route.service_key.clone(),
                            waited: wait,
                        })
                    }
                }
            }
            Err(ReadinessError::Cancelled) => return Err(ProxyError::Cancelled),
        };

        if cold_start {
            metrics::record_cold_start(&route.route_key, authority != route.authority);
            probe(&self.resolver, authority, self.settings.probe)
                .await
                .map_err(|source| ProxyError::ColdStartProbeFailed {
                    authority: authority.to_string(),
                    source,
                })?;
        }

        let upstream = prepare_upstream(request, authority, host).map_err(ForwardError::from)?;
        let header_timeout = timeouts::response_header_timeout(&route, self.settings.response_header);
        let forwarded = tokio::time::timeout(header_timeout, self.forwarder.forward(upstream))
            .await
            .unwrap_or_else(|_| Err(ForwardError::Timeout(header_timeout)));

        let mut response = match forwarded {
            Ok(response) => {
                self.stats.requests_forwarded.fetch_add(1, Ordering::Relaxed);
                response
            }
            Err(e) => {
                self.stats.forward_errors.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        if cold_start {
            if let Some(header) = &self.settings.cold_start_header {
                mark_cold_start(&mut response, header);
            }
        }
        Ok(hold_until_body_done(response, guard))
    }
}
