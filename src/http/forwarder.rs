//! The forwarding pipeline.
//!
//! ```text
//! inbound request
//!     → mount check (404 if outside)
//!     → rewrite: URI onto upstream, strip hop-by-hop, Host, X-Forwarded-For
//!     → transmit over pooled connection (deadline)
//!     → relay status/headers, stream body
//! ```
//!
//! A `Forwarder` holds no per-request state and is cheap to clone; every
//! request is an independent transaction.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Version};
use axum::response::Response;
use tokio::time::Instant;

use crate::config::ProxyConfig;
use crate::error::ForwardError;
use crate::http::request::{request_id, track_body, BodyFailure};
use crate::http::response::relay_response;
use crate::resilience::classify_client_error;
use crate::routing::MountPoint;
use crate::security::headers::{accepts_trailers, rewrite_request_headers};
use crate::upstream::{build_client, TargetError, UpstreamClient, UpstreamTarget};

/// Forwards requests under a mount point to one fixed upstream.
#[derive(Clone)]
pub struct Forwarder {
    target: Arc<UpstreamTarget>,
    mount: MountPoint,
    strip_mount_prefix: bool,
    client: UpstreamClient,
    deadline: Duration,
}

impl Forwarder {
    /// Build a forwarder from configuration.
    ///
    /// Fails only if the upstream URL is unusable.
    pub fn new(config: &ProxyConfig) -> Result<Self, TargetError> {
        let target = UpstreamTarget::parse(&config.upstream.url)?;
        let client = build_client(&config.pool, &config.timeouts);

        Ok(Self {
            target: Arc::new(target),
            mount: MountPoint::new(&config.upstream.mount_path),
            strip_mount_prefix: config.upstream.strip_mount_prefix,
            client,
            deadline: config.timeouts.request(),
        })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    /// Returns true if `path` would be forwarded.
    pub fn is_mounted(&self, path: &str) -> bool {
        self.mount.matches(path)
    }

    /// Forward one request and relay the upstream response.
    ///
    /// The caller checks [`Forwarder::is_mounted`] first; an unmounted path is
    /// reported as [`ForwardError::InvalidTarget`].
    pub async fn forward(
        &self,
        request: Request<Body>,
        peer: SocketAddr,
    ) -> Result<Response, ForwardError> {
        let deadline = Instant::now() + self.deadline;
        let id = request_id(request.headers());
        let caller_accepts_trailers = accepts_trailers(request.headers());
        let (outbound, body_failure) = self.rewrite(request, peer)?;

        let exchange = tokio::time::timeout_at(deadline, self.client.request(outbound)).await;
        match exchange {
            Ok(Ok(response)) => Ok(relay_response(
                response,
                deadline,
                &id,
                caller_accepts_trailers,
            )),
            Ok(Err(e)) => Err(classify_client_error(&e, body_failure.is_set())),
            Err(_) => Err(ForwardError::UpstreamTimeout),
        }
    }

    /// Build the outbound request for an inbound one.
    fn rewrite(
        &self,
        request: Request<Body>,
        peer: SocketAddr,
    ) -> Result<(Request<Body>, BodyFailure), ForwardError> {
        let (mut parts, body) = request.into_parts();

        let path = parts.uri.path();
        let relative = if self.strip_mount_prefix {
            self.mount.strip(path)
        } else {
            self.mount.matches(path).then_some(path)
        }
        .ok_or_else(|| ForwardError::InvalidTarget(format!("{} is outside {}", path, self.mount)))?;

        let uri = self
            .target
            .uri_for(relative, parts.uri.query())
            .map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;

        rewrite_request_headers(&mut parts.headers, self.target.host_header(), peer.ip());
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        let (body, failure) = track_body(body);
        Ok((Request::from_parts(parts, body), failure))
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("target", &self.target.url().as_str())
            .field("mount", &self.mount.prefix())
            .field("strip_mount_prefix", &self.strip_mount_prefix)
            .field("deadline", &self.deadline)
            .finish()
    }
}
