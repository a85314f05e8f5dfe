//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → headers.rs (strip hop-by-hop, Host, X-Forwarded-For)
//!     → Forward to upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Relay to caller
//! ```
//!
//! # Design Decisions
//! - Connection-scoped headers never cross the proxy boundary
//! - No authentication here; that belongs in front of the proxy

pub mod headers;
