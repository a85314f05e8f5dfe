//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, mount check)
//!     → request.rs (request ID, one-shot body tracking)
//!     → forwarder.rs (rewrite onto the upstream, transmit)
//!     → response.rs (strip hop-by-hop, stream body back)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::Forwarder;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
