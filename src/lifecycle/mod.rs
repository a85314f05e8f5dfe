//! Process lifecycle: bring the proxy up, keep it serving, take it down.
//!
//! ```text
//! startup.rs   check config → logging/metrics → HttpServer::new → bind
//! signals.rs   SIGINT / SIGTERM resolves wait_for_signal()
//! shutdown.rs  Shutdown::trigger → server stops accepting
//!              → drain() waits shutdown_grace_secs for in-flight requests
//!              → abort whatever is left
//! ```
//!
//! Any startup failure is a [`StartupError`] and ends the process non-zero
//! before the listener accepts a single connection.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{drain, Drain, Shutdown};
pub use startup::StartupError;
