//! Shutdown coordination.

use std::future::Future;
use std::io;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server (and any other long-running
/// task) subscribes to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Drive `serving` until it exits on its own or `signal` fires.
    ///
    /// On a signal, shutdown is triggered and `serving` is awaited so it can
    /// drain. An early exit of `serving` is returned as is.
    pub async fn serve_until<F, S>(&self, serving: F, signal: S) -> io::Result<()>
    where
        F: Future<Output = io::Result<()>>,
        S: Future<Output = io::Result<()>>,
    {
        tokio::pin!(serving);
        tokio::select! {
            result = &mut serving => {
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Server exited before shutdown was requested");
                }
                result
            }
            signaled = signal => {
                match &signaled {
                    Ok(()) => tracing::info!("Shutdown requested"),
                    Err(e) => tracing::warn!(error = %e, "Signal listener failed, shutting down"),
                }
                self.trigger();
                serving.await?;
                signaled
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
