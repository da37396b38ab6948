//! Queue store subsystem.
//!
//! # Data Flow
//! ```text
//! Publish:
//!     publisher → store.rs (QueueStore::push) → redis_store.rs (RPUSH)
//!
//! Watching (optional):
//!     publisher → watched.rs (record queue + timestamp)
//!     watcher.rs timer → QueueStore::length (LLEN) → metrics
//! ```
//!
//! # Design Decisions
//! - The store is a trait object so the pipeline can run against Redis or memory
//! - Watching is off by default; the watched set grows without eviction

pub mod memory;
pub mod redis_store;
pub mod store;
pub mod watched;
pub mod watcher;

pub use memory::MemoryQueueStore;
pub use redis_store::RedisQueueStore;
pub use store::{QueueStore, StoreError};
pub use watched::WatchedQueueSet;
pub use watcher::QueueDepthWatcher;
