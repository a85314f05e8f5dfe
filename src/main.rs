//! Passthrough Reverse Proxy
//!
//! Forwards requests under a mount point to a single fixed upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                  PASSTHROUGH PROXY                   │
//!                   │                                                      │
//!   Client Request  │  ┌────────┐   ┌──────────┐   ┌──────────────────┐    │
//!   ────────────────┼─▶│ http   │──▶│ routing  │──▶│    forwarder     │    │
//!                   │  │ server │   │  mount   │   │ rewrite headers, │    │
//!                   │  └────────┘   └──────────┘   │ URI, deadline    │    │
//!                   │                              └────────┬─────────┘    │
//!                   │                                       ▼              │
//!   Client Response │  ┌──────────┐                ┌──────────────────┐    │
//!   ◀───────────────┼──│ response │◀───────────────│ upstream client  │◀───┼──── Upstream
//!                   │  │ streamed │                │     (pooled)     │    │
//!                   │  └──────────┘                └──────────────────┘    │
//!                   │                                                      │
//!                   │  config · observability · lifecycle · resilience     │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use passthrough_proxy::config::{read_config, ProxyConfig};
use passthrough_proxy::lifecycle::{drain, signals, startup, Drain, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "passthrough-proxy")]
#[command(about = "Forward requests under a mount point to a single upstream", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "PASSTHROUGH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    listen: Option<String>,

    /// Upstream base URL, overrides `upstream.url`.
    #[arg(short, long)]
    upstream: Option<String>,

    /// Mount path, overrides `upstream.mount_path`.
    #[arg(short, long)]
    mount: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, startup::StartupError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(upstream) = self.upstream {
            config.upstream.url = upstream;
        }
        if let Some(mount) = self.mount {
            config.upstream.mount_path = mount;
        }

        startup::check_config(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    startup::init_observability(&config)?;

    tracing::info!("passthrough-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        mount = %config.upstream.mount_path,
        max_idle_connections = config.pool.max_idle_connections,
        idle_timeout_secs = config.pool.idle_timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let grace = config.listener.shutdown_grace();
    let ready = startup::prepare(config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let mut server = tokio::spawn(ready.server.run(ready.listener, server_shutdown));

    tokio::select! {
        result = &mut server => {
            // The server only returns on its own when accepting failed.
            result??;
            return Ok(());
        }
        _ = signals::wait_for_signal() => shutdown.trigger(),
    }

    match drain(&mut server, grace).await {
        Drain::Complete(Ok(Ok(()))) => tracing::info!("Shutdown complete"),
        Drain::Complete(Ok(Err(e))) => {
            tracing::error!(error = %e, "HTTP server failed while draining");
            return Err(e.into());
        }
        Drain::Complete(Err(e)) => {
            tracing::error!(error = %e, "HTTP server task failed while draining");
            return Err(e.into());
        }
        Drain::TimedOut => server.abort(),
    }
    Ok(())
}
