//! Timeout enforcement and upstream error classification.
//!
//! # Responsibilities
//! - Enforce one deadline over connect, response head and response body
//! - Tell timeouts apart from other transport failures
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A deadline hit before the response head is a 504; after it, the status
//!   is already committed, so the body relay is cut short instead

use std::error::Error as StdError;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use futures_util::FutureExt;
use hyper::body::{Frame, SizeHint};
use tokio::time::{Instant, Sleep};

use crate::error::ForwardError;

/// Error yielded by a relayed body whose deadline passed mid-stream.
#[derive(Debug, thiserror::Error)]
#[error("response body for request {request_id} exceeded the request deadline")]
pub struct BodyDeadlineExceeded {
    pub request_id: String,
}

/// Bound a response body by `deadline`.
///
/// Frames, trailers included, pass through as they arrive. Once `deadline`
/// passes the body yields [`BodyDeadlineExceeded`] and ends, which aborts the
/// relay.
pub fn body_with_deadline(body: Body, deadline: Instant, request_id: &str) -> Body {
    if body.is_end_stream() {
        return body;
    }

    Body::new(DeadlineBody {
        inner: body,
        sleep: Box::pin(tokio::time::sleep_until(deadline)),
        request_id: request_id.to_string(),
        expired: false,
    })
}

struct DeadlineBody {
    inner: Body,
    sleep: Pin<Box<Sleep>>,
    request_id: String,
    expired: bool,
}

impl HttpBody for DeadlineBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = self.get_mut();
        if this.expired {
            return Poll::Ready(None);
        }

        if this.sleep.poll_unpin(cx).is_ready() {
            this.expired = true;
            tracing::warn!(
                request_id = %this.request_id,
                "Response body exceeded deadline, aborting relay"
            );
            let err = BodyDeadlineExceeded {
                request_id: this.request_id.clone(),
            };
            return Poll::Ready(Some(Err(axum::Error::new(err))));
        }

        Pin::new(&mut this.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.expired || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        if self.expired {
            SizeHint::with_exact(0)
        } else {
            self.inner.size_hint()
        }
    }
}

/// Classify a failed upstream exchange.
///
/// `body_failed` is true when the inbound body errored, meaning the caller
/// disconnected mid-upload.
pub fn classify_client_error(
    err: &hyper_util::client::legacy::Error,
    body_failed: bool,
) -> ForwardError {
    if body_failed {
        return ForwardError::ClientDisconnect;
    }
    classify_error_chain(err)
}

/// Classify an upstream failure by walking its source chain.
pub fn classify_error_chain(err: &(dyn StdError + 'static)) -> ForwardError {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            // HttpConnector reports an expired connect timeout as TimedOut.
            // No response head arrived before a deadline, so it is a 504.
            if io_err.kind() == io::ErrorKind::TimedOut {
                return ForwardError::UpstreamTimeout;
            }
        }
        if let Some(hyper_err) = cause.downcast_ref::<hyper::Error>() {
            if hyper_err.is_parse() || hyper_err.is_incomplete_message() {
                return ForwardError::ProtocolViolation(hyper_err.to_string());
            }
            if hyper_err.is_timeout() {
                return ForwardError::UpstreamTimeout;
            }
        }
        source = cause.source();
    }

    ForwardError::UpstreamUnreachable(error_chain(err))
}

/// Render an error and its sources as `outer: inner: ...`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
