//! Shutdown coordination for the proxy.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to every running server.
///
/// Cloning shares the channel, so any clone can stop all subscribers.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver handed to `HttpServer::run`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop every subscriber. Harmless with none left.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of waiting for a task to drain.
#[derive(Debug, PartialEq, Eq)]
pub enum Drain<T> {
    /// The task finished within the grace period with this output.
    Complete(T),
    /// The grace period ran out first.
    TimedOut,
}

/// Wait up to `grace` for `task` to finish.
pub async fn drain<F: Future>(task: F, grace: Duration) -> Drain<F::Output> {
    match tokio::time::timeout(grace, task).await {
        Ok(output) => Drain::Complete(output),
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline passed, forcing exit");
            Drain::TimedOut
        }
    }
}
