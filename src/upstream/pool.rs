//! Pooled HTTP client for the upstream.
//!
//! # Responsibilities
//! - Build the hyper-util client shared by every request
//! - Bound connection reuse (idle ceiling, idle timeout)
//! - Bound connection establishment (connect timeout)
//!
//! # Design Decisions
//! - One client per Forwarder; the pool is internally synchronized
//! - Exceeding the idle ceiling closes the extra connection when it is
//!   returned, so checkouts never wait on the pool
//! - A connection whose request was cancelled is dropped, never reused

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{PoolConfig, TimeoutConfig};

/// Client type used to reach the upstream.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the pooled upstream client.
pub fn build_client(pool: &PoolConfig, timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(timeouts.connect()));
    connector.set_nodelay(true);

    tracing::debug!(
        max_idle_connections = pool.max_idle_connections,
        idle_timeout_secs = pool.idle_timeout_secs,
        connect_timeout_secs = timeouts.connect_secs,
        "Building upstream client"
    );

    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_idle_timeout(pool.idle_timeout())
        .pool_max_idle_per_host(pool.max_idle_connections)
        .build(connector)
}
