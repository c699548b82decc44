//! Request handling and transformation.
//!
//! # Responsibilities
//! - Extract routing-relevant information (host, request ID)
//! - Prepare request for forwarding to backend
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (tower-http layer)
//! - The inbound Host header is preserved on the forwarded request

use axum::body::Body;
use axum::http::{header, uri::PathAndQuery, HeaderValue, Request, Uri, Version};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Host the client addressed: the `Host` header, else the URI authority
/// (HTTP/2 requests carry it there).
pub fn request_host<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Point `request` at `http://<authority><path-and-query>` for the upstream
/// hop. `host` is pinned as the Host header when the client sent none.
pub fn prepare_upstream(
    mut request: Request<Body>,
    authority: &str,
    host: &str,
) -> Result<Request<Body>, axum::http::Error> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    let uri = Uri::builder()
        .scheme("http")
        .authority(authority)
        .path_and_query(path_and_query)
        .build()?;

    *request.uri_mut() = uri;
    *request.version_mut() = Version::HTTP_11;
    if !request.headers().contains_key(header::HOST) && !host.is_empty() {
        let value = HeaderValue::from_str(host)?;
        request.headers_mut().insert(header::HOST, value);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_host_prefers_header() {
        let req = Request::builder()
            .uri("http://h2.example.com/x")
            .header("host", "a.com:8080")
            .body(())
            .unwrap();
        assert_eq!(request_host(&req), Some("a.com:8080"));

        let req = Request::builder()
            .uri("http://h2.example.com/x")
            .body(())
            .unwrap();
        assert_eq!(request_host(&req), Some("h2.example.com"));

        let req = Request::builder().uri("/x").body(()).unwrap();
        assert_eq!(request_host(&req), None);
    }

    #[test]
    fn test_prepare_upstream() {
        let req = Request::builder()
            .uri("/api/v1?q=1")
            .header("host", "a.com")
            .body(Body::empty())
            .unwrap();
        let out = prepare_upstream(req, "svc.default:8080", "a.com").unwrap();
        assert_eq!(out.uri().to_string(), "http://svc.default:8080/api/v1?q=1");
        assert_eq!(out.headers()["host"], "a.com");
        assert_eq!(out.version(), Version::HTTP_11);
    }

    #[test]
    fn test_prepare_upstream_sets_missing_host() {
        let req = Request::builder()
            .uri("http://a.com/")
            .version(Version::HTTP_2)
            .body(Body::empty())
            .unwrap();
        let out = prepare_upstream(req, "svc.default:80", "a.com").unwrap();
        assert_eq!(out.headers()["host"], "a.com");
    }
}
