//! Passthrough reverse proxy library.
//!
//! Forwards every request under a mount point to one fixed upstream and
//! streams the response back.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use config::schema::ProxyConfig;
pub use error::ForwardError;
pub use http::{Forwarder, HttpServer};
pub use lifecycle::Shutdown;
