//! Upstream forwarding.
//!
//! The pipeline only depends on the [`Forwarder`] trait so the transport can
//! be swapped in tests. [`HyperForwarder`] is the pooled production client.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use thiserror::Error;

use crate::net::ProxyClient;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
    #[error("no response headers within {0:?}")]
    Timeout(Duration),
    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Sends a prepared request (absolute URI) upstream and yields the response
/// once its headers arrive.
pub trait Forwarder: Send + Sync + 'static {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, ForwardError>>;
}

#[derive(Clone)]
pub struct HyperForwarder {
    client: ProxyClient,
}

impl HyperForwarder {
    pub fn new(client: ProxyClient) -> Self {
        Self { client }
    }
}

impl Forwarder for HyperForwarder {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, ForwardError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let response: hyper::Response<Incoming> = client.request(request).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
