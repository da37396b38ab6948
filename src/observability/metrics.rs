//! Process-wide publish metrics.
//!
//! # Responsibilities
//! - Count index hits, put attempts, successes, errors and warnings
//! - Hold the last sampled length of each watched queue
//! - Hand out consistent-enough snapshots for exposition and logging
//!
//! # Design Decisions
//! - One `AtomicU64` per counter; the request path never takes a lock
//! - Queue lengths live in a sharded map and are overwritten, not summed
//! - Constructed once at startup and shared through `Arc`, never global

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated counters updated by every request.
#[derive(Debug)]
pub struct Metrics {
    index_hits: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    successes: AtomicU64,
    put_requests: AtomicU64,
    started_at: DateTime<Utc>,
    queue_lengths: DashMap<String, i64>,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub index_hits: u64,
    pub warnings: u64,
    pub errors: u64,
    pub successes: u64,
    pub put_requests: u64,
    pub started_at: DateTime<Utc>,
    pub queue_lengths: BTreeMap<String, i64>,
}

impl MetricsSnapshot {
    /// Time since the process started.
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            index_hits: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            put_requests: AtomicU64::new(0),
            started_at: Utc::now(),
            queue_lengths: DashMap::new(),
        }
    }

    pub fn incr_index(&self) {
        self.index_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_put(&self) {
        self.put_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the latest observed length of a queue.
    pub fn set_queue_length(&self, name: &str, length: i64) {
        match self.queue_lengths.get_mut(name) {
            Some(mut entry) => *entry = length,
            None => {
                self.queue_lengths.insert(name.to_string(), length);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            index_hits: self.index_hits.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            put_requests: self.put_requests.load(Ordering::Relaxed),
            started_at: self.started_at,
            queue_lengths: self
                .queue_lengths
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
