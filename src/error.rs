//! Per-request forwarding errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why a request could not be relayed.
///
/// Every variant is contained to the request that produced it. The `Display`
/// text is for logs; callers only ever see the generic status body.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Connection-level failure reaching the upstream.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The exchange exceeded its deadline before the response head arrived.
    #[error("upstream timed out")]
    UpstreamTimeout,

    /// The upstream answered with something that is not HTTP.
    #[error("malformed upstream response: {0}")]
    ProtocolViolation(String),

    /// The caller went away while its request body was being forwarded.
    #[error("client disconnected")]
    ClientDisconnect,

    /// The inbound target could not be turned into an upstream URI.
    #[error("invalid request target: {0}")]
    InvalidTarget(String),
}

/// Status recorded for requests whose caller disconnected (nginx convention).
/// Never written to a live connection.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

impl ForwardError {
    /// Status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::UpstreamUnreachable(_) | ForwardError::ProtocolViolation(_) => {
                StatusCode::BAD_GATEWAY
            }
            ForwardError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ForwardError::ClientDisconnect => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::UpstreamUnreachable(_) => "unreachable",
            ForwardError::UpstreamTimeout => "timeout",
            ForwardError::ProtocolViolation(_) => "protocol",
            ForwardError::ClientDisconnect => "client_disconnect",
            ForwardError::InvalidTarget(_) => "invalid_target",
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Nobody is listening; hyper discards whatever we return.
            ForwardError::ClientDisconnect => status.into_response(),
            _ => (
                status,
                status.canonical_reason().unwrap_or("Upstream error"),
            )
                .into_response(),
        }
    }
}
