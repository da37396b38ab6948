//! In-process queue store.
//!
//! Lists kept in a sharded map; used by tests and local runs without Redis.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::queue::store::{QueueStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    lists: DashMap<String, Vec<String>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the items in `queue`, head first.
    pub fn items(&self, queue: &str) -> Vec<String> {
        self.lists
            .get(queue)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn push(&self, queue: &str, payload: &str) -> Result<i64, StoreError> {
        let mut list = self.lists.entry(queue.to_string()).or_default();
        list.push(payload.to_string());
        Ok(list.len() as i64)
    }

    async fn length(&self, queue: &str) -> Result<i64, StoreError> {
        Ok(self.lists.get(queue).map(|list| list.len() as i64).unwrap_or(0))
    }
}
