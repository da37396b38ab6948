//! Queue depth watching.
//!
//! # Responsibilities
//! - Periodically query the length of every watched queue
//! - Record the result in the metrics aggregator

use std::sync::Arc;
use std::time::Duration;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::Metrics;
use crate::queue::store::{QueueStore, StoreError};
use crate::queue::watched::WatchedQueueSet;

pub struct QueueDepthWatcher {
    store: Arc<dyn QueueStore>,
    watched: Arc<WatchedQueueSet>,
    metrics: Arc<Metrics>,
    interval: Duration,
    io_timeout: Duration,
}

impl QueueDepthWatcher {
    pub fn new(
        store: Arc<dyn QueueStore>,
        watched: Arc<WatchedQueueSet>,
        metrics: Arc<Metrics>,
        interval: Duration,
        io_timeout: Duration,
    ) -> Self {
        Self {
            store,
            watched,
            metrics,
            interval,
            io_timeout,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            watched = self.watched.len(),
            "Queue depth watcher starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Queue depth watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Sample every watched queue once. Queries run concurrently so one slow
    /// queue only delays its own result.
    pub async fn check_all(&self) {
        let queues = self.watched.snapshot();

        let checks = queues.iter().map(|(queue, last_seen)| async move {
            tracing::debug!(channel = %queue, last_seen = %last_seen, "Checking channel length");

            let result = match time::timeout(self.io_timeout, self.store.length(queue)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.io_timeout.as_millis() as u64)),
            };

            match result {
                Ok(length) => {
                    tracing::debug!(channel = %queue, length, "LLEN result for watched channel");
                    self.metrics.set_queue_length(queue, length);
                }
                Err(e) => {
                    tracing::warn!(channel = %queue, error = %e, "Channel length check failed");
                    self.metrics.incr_warning();
                }
            }
        });

        join_all(checks).await;
    }
}
