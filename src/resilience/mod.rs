//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline over head, then over the relayed body)
//!     → On failure: timeouts.rs classifies the error (502 / 504 / disconnect)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream exchange has a deadline
//! - No retries: request bodies are one-shot streams

pub mod timeouts;

pub use timeouts::{
    body_with_deadline, classify_client_error, classify_error_chain, error_chain,
    BodyDeadlineExceeded,
};
