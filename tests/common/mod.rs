//! Shared helpers for gateway integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::Uri, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use zeroscale_gateway::config::GatewayConfig;
use zeroscale_gateway::control::DataPlane;
use zeroscale_gateway::readiness::{Endpoint, EndpointConditions, EndpointSlice};
use zeroscale_gateway::routing::rule::{FailoverRef, RouteTimeouts, ScaleTargetRef};
use zeroscale_gateway::routing::RouteRule;
use zeroscale_gateway::{Gateway, Shutdown};

/// A running gateway on ephemeral ports. Shuts down on drop.
pub struct TestGateway {
    pub proxy_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub data: DataPlane,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub fn proxy_url(&self, path: &str) -> String {
        format!("http://{}{}", self.proxy_addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }

    /// GET `path` on the proxy with the given Host header.
    pub async fn get(&self, host: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.proxy_url(path))
            .header("host", host)
            .send()
            .await
            .expect("proxy request failed")
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let shutdown = Shutdown::new();
    let gateway = Gateway::new(config, shutdown.clone());
    let data = gateway.data_plane().clone();

    let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = proxy.local_addr().unwrap();
    let admin_addr = admin.local_addr().unwrap();

    let (updates, rx) = mpsc::unbounded_channel();
    tokio::spawn(gateway.serve(proxy, Some(admin), Some(rx)));

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    TestGateway {
        proxy_addr,
        admin_addr,
        data,
        shutdown,
        updates,
        client,
    }
}

/// Start a backend answering `<name>:<path>`. `/slow` answers after 500ms.
pub async fn start_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move |uri: Uri| async move {
        if uri.path() == "/slow" {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        format!("{}:{}", name, uri.path())
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Config whose static host table points every named service at localhost.
pub fn config_for(services: &[&str]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.observability.metrics_enabled = false;
    config.timeouts.response_header_ms = 2_000;
    config.cold_start.probe_timeout_ms = 1_000;
    for service in services {
        config
            .transport
            .static_hosts
            .insert(format!("{}.default", service), "127.0.0.1".to_string());
    }
    config
}

pub fn rule(name: &str, host: &str, prefix: &str, service: &str, port: u16) -> RouteRule {
    RouteRule {
        name: name.to_string(),
        hosts: vec![host.to_string()],
        path_prefixes: vec![prefix.to_string()],
        scale_target: ScaleTargetRef {
            service: service.to_string(),
            port,
            port_name: None,
        },
        ..Default::default()
    }
}

pub fn with_wait(mut rule: RouteRule, condition_wait_ms: u64) -> RouteRule {
    rule.timeouts = Some(RouteTimeouts {
        condition_wait_ms,
        response_header_ms: 0,
    });
    rule
}

pub fn with_failover(mut rule: RouteRule, service: &str, port: u16) -> RouteRule {
    rule.failover = Some(FailoverRef {
        service: service.to_string(),
        port,
        port_name: None,
        timeout_seconds: 0,
    });
    rule
}

pub fn ready_slice(service: &str) -> EndpointSlice {
    EndpointSlice {
        namespace: "default".to_string(),
        service_name: service.to_string(),
        endpoints: vec![Endpoint {
            addresses: vec!["127.0.0.1".to_string()],
            conditions: EndpointConditions {
                ready: Some(true),
                terminating: None,
            },
        }],
    }
}

/// Poll `check` every 10ms until it holds or `timeout` passes.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
