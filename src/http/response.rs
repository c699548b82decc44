//! Response handling and transformation.
//!
//! # Responsibilities
//! - Synthesize plain-text error responses
//! - Annotate cold-start responses
//! - Tie the admission guard to the response body's lifetime
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend timeouts result in 502 Bad Gateway

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::StreamExt;

use crate::counter::CounterGuard;

/// `status` with its reason phrase as a text body.
pub fn plain(status: StatusCode) -> Response<Body> {
    let reason = status.canonical_reason().unwrap_or("Error");
    (status, reason).into_response()
}

pub fn mark_cold_start(response: &mut Response<Body>, header: &HeaderName) {
    response
        .headers_mut()
        .insert(header.clone(), HeaderValue::from_static("true"));
}

/// Keep `guard` alive until the body has been fully sent or dropped.
pub fn hold_until_body_done(response: Response<Body>, guard: CounterGuard) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let stream = body.into_data_stream().map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(stream))
}
