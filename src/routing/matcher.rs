//! Route matching primitives.
//!
//! # Responsibilities
//! - Normalize path prefixes and request paths to segment boundaries
//! - Normalize the request host (strip port, fold case)
//! - Evaluate header match conditions
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive
//! - Both sides of a path comparison end in `/`, so `/api/` matches
//!   `/api/v1/` but not `/api2/`
//! - No regex, no allocation unless normalization has to change the input

use std::borrow::Cow;

use axum::http::HeaderMap;

/// A single header condition, compiled at rebuild time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatcher {
    /// Lowercased header name.
    name: String,
    /// Required value; `None` is a presence-only check.
    value: Option<String>,
}

impl HeaderMatcher {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            // An empty declared value behaves like "no value".
            value: value.filter(|v| !v.is_empty()).map(str::to_string),
        }
    }

    /// True when the header is present and, if a value is declared, at
    /// least one occurrence equals it.
    pub fn matches(&self, headers: &HeaderMap) -> bool {
        let mut values = headers.get_all(self.name.as_str()).iter().peekable();
        if values.peek().is_none() {
            return false;
        }
        match &self.value {
            None => true,
            Some(expected) => values.any(|v| v.as_bytes() == expected.as_bytes()),
        }
    }
}

/// True when every matcher holds.
pub fn headers_match(matchers: &[HeaderMatcher], headers: &HeaderMap) -> bool {
    matchers.iter().all(|m| m.matches(headers))
}

/// Normalize a configured path prefix so it starts and ends with `/`.
/// The root `/` (and the empty prefix) stays `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        return "/".to_string();
    }
    let mut normalized = String::with_capacity(prefix.len() + 2);
    if !prefix.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(prefix);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Normalize a request path to end with `/`, symmetric with
/// [`normalize_prefix`]. Borrows when no change is needed.
pub fn normalize_request_path(path: &str) -> Cow<'_, str> {
    if path.is_empty() {
        return Cow::Borrowed("/");
    }
    if path.ends_with('/') {
        return Cow::Borrowed(path);
    }
    let mut owned = String::with_capacity(path.len() + 1);
    owned.push_str(path);
    owned.push('/');
    Cow::Owned(owned)
}

/// Strip a trailing `:port`. Bracketed IPv6 hosts keep their brackets.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(i) => &host[..=i],
            None => host,
        };
    }
    match host.rfind(':') {
        Some(i) => &host[..i],
        None => host,
    }
}

/// Strip the port and fold to lowercase, borrowing when already lowercase.
pub fn normalize_host(host: &str) -> Cow<'_, str> {
    let host = strip_port(host);
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("/api"), "/api/");
        assert_eq!(normalize_prefix("api"), "/api/");
        assert_eq!(normalize_prefix("/api/"), "/api/");
    }

    #[test]
    fn test_normalize_request_path() {
        assert_eq!(normalize_request_path("/"), "/");
        assert_eq!(normalize_request_path(""), "/");
        assert_eq!(normalize_request_path("/api/v1"), "/api/v1/");
        assert!(matches!(normalize_request_path("/api/"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(normalize_host("EXAMPLE.com:80"), "example.com");
    }

    #[test]
    fn test_header_matcher() {
        let mut headers = HeaderMap::new();
        headers.append("x-tenant", HeaderValue::from_static("a"));
        headers.append("x-tenant", HeaderValue::from_static("b"));

        assert!(HeaderMatcher::new("X-Tenant", None).matches(&headers));
        assert!(HeaderMatcher::new("x-tenant", Some("b")).matches(&headers));
        assert!(!HeaderMatcher::new("x-tenant", Some("c")).matches(&headers));
        assert!(!HeaderMatcher::new("x-other", None).matches(&headers));
        // Empty value is presence-only
        assert!(HeaderMatcher::new("x-tenant", Some("")).matches(&headers));
    }
}
