//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! upstream.url (config)
//!     → target.rs (parse once, pre-compute authority/Host/prefix)
//!     → pool.rs (pooled client bound to connect/idle limits)
//!     → used by the Forwarder for every request
//! ```

pub mod pool;
pub mod target;

pub use pool::{build_client, UpstreamClient};
pub use target::{TargetError, UpstreamTarget};
