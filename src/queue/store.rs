//! Queue store abstraction.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a queue store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store answered with an error.
    #[error("command error: {0}")]
    Command(String),

    /// The operation did not finish within the I/O timeout.
    #[error("operation timed out after {0} ms")]
    Timeout(u64),
}

/// A list-based store addressed by queue name.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append `payload` to the tail of `queue`, returning the new length.
    async fn push(&self, queue: &str, payload: &str) -> Result<i64, StoreError>;

    /// Current number of items in `queue`.
    async fn length(&self, queue: &str) -> Result<i64, StoreError>;
}
