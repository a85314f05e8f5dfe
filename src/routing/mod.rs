//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → matcher.rs (is the path under the mount point?)
//!     → Return: remainder below the mount, or NoMatch (404)
//! ```
//!
//! # Design Decisions
//! - Mount point compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Explicit NoMatch rather than silent default

pub mod matcher;

pub use matcher::MountPoint;
