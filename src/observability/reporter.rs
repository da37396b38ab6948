//! Periodic metrics logging.
//!
//! Enabled in verbose mode; emits one debug line with all counters per
//! interval until shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics::Metrics;

pub struct MetricsReporter {
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self { metrics, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(interval_secs = self.interval.as_secs(), "Metrics reporter starting");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.report(),
                _ = shutdown.recv() => {
                    tracing::debug!("Metrics reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn report(&self) {
        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            index = snapshot.index_hits,
            put = snapshot.put_requests,
            warnings = snapshot.warnings,
            errors = snapshot.errors,
            success = snapshot.successes,
            uptime_secs = snapshot.uptime().num_seconds(),
            "Metrics"
        );
    }
}
