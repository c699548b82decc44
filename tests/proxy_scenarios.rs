//! End-to-end proxy scenarios against in-process backends.

use std::time::{Duration, Instant};

use reqwest::StatusCode;

mod common;
use common::*;

#[tokio::test]
async fn test_ready_backend_is_proxied() {
    let backend = start_backend("svc").await;
    let mut config = config_for(&["svc"]);
    config.cluster.routes = vec![rule("web", "a.com", "/", "svc", backend.port())];
    config.cluster.endpoint_slices = vec![ready_slice("svc")];
    let gw = start_gateway(config).await;

    let res = gw.get("a.com", "/anything").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-cold-start").is_none());
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), "svc:/anything");

    let data = gw.data.clone();
    assert!(
        eventually(Duration::from_secs(1), || data.counter.concurrency("default/web") == Some(0)).await,
        "concurrency did not return to zero"
    );
}

#[tokio::test]
async fn test_unknown_host_is_404() {
    let backend = start_backend("svc").await;
    let mut config = config_for(&["svc"]);
    config.cluster.routes = vec![rule("web", "a.com", "/", "svc", backend.port())];
    config.cluster.endpoint_slices = vec![ready_slice("svc")];
    let gw = start_gateway(config).await;

    let res = gw.get("b.com", "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_never_ready_without_failover_is_502() {
    let backend = start_backend("svc").await;
    let mut config = config_for(&["svc"]);
    config.timeouts.condition_wait_ms = 200;
    config.cluster.routes = vec![rule("web", "a.com", "/", "svc", backend.port())];
    let gw = start_gateway(config).await;

    let start = Instant::now();
    let res = gw.get("a.com", "/").await;
    let elapsed = start.elapsed();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1000), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_failover_after_wait_timeout() {
    let primary = start_backend("primary").await;
    let fallback = start_backend("fallback").await;
    let mut config = config_for(&["primary", "fallback"]);
    let route = with_wait(rule("web", "a.com", "/", "primary", primary.port()), 200);
    config.cluster.routes = vec![with_failover(route, "fallback", fallback.port())];
    let gw = start_gateway(config).await;

    let res = gw.get("a.com", "/page").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cold-start"], "true");
    assert_eq!(res.text().await.unwrap(), "fallback:/page");
}

#[tokio::test]
async fn test_longest_prefix_selects_route() {
    let web = start_backend("web").await;
    let api = start_backend("api").await;
    let mut config = config_for(&["web", "api"]);
    config.cluster.routes = vec![
        rule("web", "x.com", "/", "web", web.port()),
        rule("api", "x.com", "/api/", "api", api.port()),
    ];
    config.cluster.endpoint_slices = vec![ready_slice("web"), ready_slice("api")];
    let gw = start_gateway(config).await;

    let res = gw.get("x.com", "/api/v1").await;
    assert_eq!(res.text().await.unwrap(), "api:/api/v1");

    let res = gw.get("x.com", "/other").await;
    assert_eq!(res.text().await.unwrap(), "web:/other");
}

#[tokio::test]
async fn test_cold_start_is_held_until_ready() {
    let backend = start_backend("svc").await;
    let mut config = config_for(&["svc"]);
    config.cluster.routes = vec![rule("web", "a.com", "/", "svc", backend.port())];
    let gw = start_gateway(config.clone()).await;

    let updates = gw.updates.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        config.cluster.endpoint_slices = vec![ready_slice("svc")];
        updates.send(config).unwrap();
    });

    let start = Instant::now();
    let res = gw.get("a.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cold-start"], "true");
    assert!(start.elapsed() >= Duration::from_millis(150));

    // Warm now: no annotation
    let res = gw.get("a.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-cold-start").is_none());
}

#[tokio::test]
async fn test_reload_adds_route() {
    let backend = start_backend("svc").await;
    let mut config = config_for(&["svc"]);
    config.cluster.endpoint_slices = vec![ready_slice("svc")];
    let gw = start_gateway(config.clone()).await;

    assert_eq!(gw.get("new.com", "/").await.status(), StatusCode::NOT_FOUND);

    config.cluster.routes = vec![rule("new", "new.com", "/", "svc", backend.port())];
    gw.updates.send(config).unwrap();
    let data = gw.data.clone();
    assert!(eventually(Duration::from_secs(1), || data.routing.route_count() == 1).await);

    let res = gw.get("new.com", "/").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dead_backend_is_502() {
    // Reserve a port nobody listens on
    let port = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut config = config_for(&["svc"]);
    config.cluster.routes = vec![rule("web", "a.com", "/", "svc", port)];
    config.cluster.endpoint_slices = vec![ready_slice("svc")];
    let gw = start_gateway(config).await;

    let res = gw.get("a.com", "/").await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}
