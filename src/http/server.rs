//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router around the forwarding handler
//! - Wire up middleware (request ID assignment and propagation)
//! - Bind server to listener
//! - Reject paths outside the mount point
//! - Emit one log record and one metrics sample per request

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::ProxyConfig;
use crate::error::ForwardError;
use crate::http::forwarder::Forwarder;
use crate::http::request::{request_id, InFlight, X_REQUEST_ID};
use crate::observability::metrics;
use crate::upstream::TargetError;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub forwarder: Forwarder,
}

/// HTTP server for the passthrough proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, TargetError> {
        let forwarder = Forwarder::new(&config)?;

        tracing::info!(
            upstream = %forwarder.target(),
            mount = %forwarder.mount(),
            deadline_secs = config.timeouts.request_secs,
            "Forwarder ready"
        );

        let router = Self::build_router(AppState { forwarder });
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone())),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are drained before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Checks the mount point and forwards the request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if !state.forwarder.is_mounted(&path) {
        tracing::debug!(request_id = %request_id, method = %method, path = %path, "Path outside mount point");
        metrics::record_request(method.as_str(), StatusCode::NOT_FOUND.as_u16(), start_time);
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let in_flight = InFlight::new(&request_id);
    let outcome = state.forwarder.forward(request, peer).await;
    in_flight.finish();

    let elapsed_ms = start_time.elapsed().as_millis() as u64;
    match outcome {
        Ok(response) => {
            let status = response.status().as_u16();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status,
                elapsed_ms,
                "Request forwarded"
            );
            metrics::record_request(method.as_str(), status, start_time);
            response
        }
        Err(err) => {
            let status = err.status().as_u16();
            match &err {
                ForwardError::ClientDisconnect => tracing::debug!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status,
                    elapsed_ms,
                    "Client disconnected during upload"
                ),
                _ => tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status,
                    elapsed_ms,
                    error = %err,
                    "Upstream request failed"
                ),
            }
            metrics::record_upstream_error(err.kind());
            metrics::record_request(method.as_str(), status, start_time);
            err.into_response()
        }
    }
}
