//! Upstream response relay.
//!
//! # Responsibilities
//! - Turn the upstream response into the caller-facing response
//! - Strip hop-by-hop headers from it
//! - Stream the body through under the request deadline, trailers included
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - Status and end-to-end headers are relayed unchanged

use axum::body::Body;
use axum::http::Response;
use axum::response::Response as AxumResponse;
use hyper::body::Incoming;
use tokio::time::Instant;

use crate::resilience::body_with_deadline;
use crate::security::headers::rewrite_response_headers;

/// Relay an upstream response to the caller.
///
/// `request_id` tags a deadline abort of the body with its request.
pub fn relay_response(
    upstream: Response<Incoming>,
    deadline: Instant,
    request_id: &str,
    caller_accepts_trailers: bool,
) -> AxumResponse {
    let (mut parts, body) = upstream.into_parts();
    rewrite_response_headers(&mut parts.headers, caller_accepts_trailers);
    // hyper picks the wire version for the caller's connection.
    parts.version = Default::default();

    let body = body_with_deadline(Body::new(body), deadline, request_id);
    AxumResponse::from_parts(parts, body)
}
