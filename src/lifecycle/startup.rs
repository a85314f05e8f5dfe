//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Initialize logging and (optionally) metrics
//! - Build the forwarder and bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and exits non-zero
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::observability::logging::{self, LoggingError};
use crate::observability::metrics;
use crate::upstream::TargetError;

/// Errors that stop the proxy before it serves traffic.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("upstream error: {0}")]
    Upstream(#[from] TargetError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A server that is bound and ready to run.
pub struct Ready {
    pub server: HttpServer,
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
}

/// Validate the final configuration.
pub fn check_config(config: &ProxyConfig) -> Result<(), StartupError> {
    validate_config(config).map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))
}

/// Install logging and metrics exporters for `config`.
pub fn init_observability(config: &ProxyConfig) -> Result<(), StartupError> {
    logging::init(&config.observability)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|e| {
            StartupError::Bind {
                address: config.observability.metrics_address.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            }
        })?;
        metrics::init_metrics(addr)?;
    }
    Ok(())
}

/// Build the server and bind its listener.
pub async fn prepare(config: ProxyConfig) -> Result<Ready, StartupError> {
    let address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: address.clone(),
        source,
    })?;

    tracing::info!(address = %local_addr, "Listening for connections");

    Ok(Ready {
        server,
        listener,
        local_addr,
    })
}
