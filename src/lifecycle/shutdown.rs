//! Shutdown coordination for the gateway.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Phase of the process lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting and serving requests.
    Running = 0,
    /// No new connections; in-flight requests finishing.
    Draining = 1,
    /// Listener closed.
    Stopped = 2,
}

impl From<u8> for ShutdownState {
    fn from(val: u8) -> Self {
        match val {
            0 => ShutdownState::Running,
            1 => ShutdownState::Draining,
            _ => ShutdownState::Stopped,
        }
    }
}

/// The drain did not complete cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The server failed while serving or draining.
    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),

    /// In-flight requests were still running when the grace period ended.
    #[error("drain did not finish within {0:?}")]
    GraceExpired(Duration),
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
/// Clones share the same channel and state.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    state: Arc<AtomicU8>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            state: Arc::new(AtomicU8::new(ShutdownState::Running as u8)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Move from Running to Draining and notify subscribers.
    ///
    /// Returns false if shutdown was already under way.
    pub fn trigger(&self) -> bool {
        let moved = self
            .state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::Draining as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if moved {
            tracing::info!("Shutdown triggered, draining");
            let _ = self.tx.send(());
        }
        moved
    }

    /// Record that the listener has closed.
    pub fn mark_stopped(&self) {
        self.state.store(ShutdownState::Stopped as u8, Ordering::SeqCst);
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from(self.state.load(Ordering::SeqCst))
    }

    /// Resolve once shutdown has been triggered, even if that happened before
    /// `rx` was created.
    pub async fn wait(&self, mut rx: broadcast::Receiver<()>) {
        if self.state() != ShutdownState::Running {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_transitions() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.state(), ShutdownState::Running);

        assert!(shutdown.trigger());
        assert_eq!(shutdown.state(), ShutdownState::Draining);
        rx.recv().await.unwrap();

        assert!(!shutdown.trigger());
        shutdown.mark_stopped();
        assert_eq!(shutdown.state(), ShutdownState::Stopped);
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let late = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait(late))
            .await
            .expect("wait must not block once draining");
    }

    #[tokio::test]
    async fn test_clones_share_signal() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        let rx = shutdown.subscribe();
        assert_eq!(clone.receiver_count(), 1);

        let waiter = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.wait(rx).await }
        });
        clone.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
