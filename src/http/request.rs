//! Inbound request handling.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Wrap the one-shot inbound body so an upload failure is observable
//! - Track in-flight requests so a caller disconnect is logged when it cancels one
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is relayed frame by frame, never buffered; it can be read
//!   exactly once

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{HeaderMap, HeaderName};
use hyper::body::{Frame, SizeHint};

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID for a request, or `"unknown"` when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Set when reading the inbound body failed.
#[derive(Debug, Clone, Default)]
pub struct BodyFailure(Arc<AtomicBool>);

impl BodyFailure {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Wrap an inbound body for forwarding.
///
/// Empty bodies are passed through untouched. Anything else is relayed frame
/// by frame, trailers included, and any read error is recorded in the
/// returned [`BodyFailure`].
pub fn track_body(body: Body) -> (Body, BodyFailure) {
    let failure = BodyFailure::default();
    if body.is_end_stream() {
        return (body, failure);
    }

    let tracked = TrackedBody {
        inner: body,
        failure: failure.clone(),
    };
    (Body::new(tracked), failure)
}

struct TrackedBody {
    inner: Body,
    failure: BodyFailure,
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = self.get_mut();
        let frame = ready!(Pin::new(&mut this.inner).poll_frame(cx));
        if let Some(Err(e)) = &frame {
            tracing::debug!(error = %e, "Inbound body read failed");
            this.failure.set();
        }
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Marks a request as in flight; logs a cancellation if dropped unfinished.
///
/// Hyper drops the handler future when the caller disconnects, which drops
/// this guard along with the pending upstream request.
#[derive(Debug)]
pub struct InFlight {
    request_id: String,
    finished: bool,
}

impl InFlight {
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            finished: false,
        }
    }

    /// The request reached a response (success or error).
    pub fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                request_id = %self.request_id,
                "Client disconnected, upstream request cancelled"
            );
        }
    }
}
