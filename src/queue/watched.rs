//! Set of queues sampled by the depth watcher.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Queue name → last time a publish targeted it.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct WatchedQueueSet {
    queues: DashMap<String, DateTime<Utc>>,
}

impl WatchedQueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `queue` as seen at `at`. Returns true if it was not watched before.
    pub fn touch(&self, queue: &str, at: DateTime<Utc>) -> bool {
        match self.queues.get_mut(queue) {
            Some(mut last_seen) => {
                *last_seen = at;
                false
            }
            None => self.queues.insert(queue.to_string(), at).is_none(),
        }
    }

    pub fn last_seen(&self, queue: &str) -> Option<DateTime<Utc>> {
        self.queues.get(queue).map(|entry| *entry.value())
    }

    /// Copy of all entries, for one watcher pass.
    pub fn snapshot(&self) -> Vec<(String, DateTime<Utc>)> {
        self.queues
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
