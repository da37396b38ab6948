//! Redis-backed queue store.
//!
//! # Design Decisions
//! - One multiplexed `ConnectionManager` shared by all requests
//! - Connected lazily on first use; a failed connect is retried by the next call
//! - The slot lock is never held across a connect, so during an outage each
//!   request waits only for its own attempt
//! - Every round-trip is bounded by the configured I/O timeout

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use tokio::time;

use crate::config::RedisConfig;
use crate::queue::store::{QueueStore, StoreError};

pub struct RedisQueueStore {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl RedisQueueStore {
    /// Prepare a store for the server at `addr`. No connection is made yet.
    pub fn new(addr: SocketAddr, config: &RedisConfig) -> Result<Self, StoreError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(addr.ip().to_string(), addr.port()),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info).map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            io_timeout: Duration::from_secs(config.io_timeout_secs),
        })
    }

    /// Build a store with explicit timeouts.
    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let cached = self.slot().clone();
        if let Some(manager) = cached {
            return Ok(manager);
        }

        let connect = ConnectionManager::new(self.client.clone());
        let manager = match time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(manager)) => manager,
            Ok(Err(e)) => return Err(StoreError::Connection(e.to_string())),
            Err(_) => return Err(StoreError::Timeout(self.connect_timeout.as_millis() as u64)),
        };

        // Concurrent connects may race; the first one stored is shared.
        let mut slot = self.slot();
        if slot.is_none() {
            tracing::info!(
                address = ?self.client.get_connection_info().addr,
                "Redis connection established"
            );
        }
        Ok(slot.get_or_insert(manager).clone())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ConnectionManager>> {
        // The slot holds a cloneable handle; a poisoned lock leaves it intact.
        self.connection.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match time::timeout(self.io_timeout, op).await {
            Ok(result) => result.map_err(map_redis_error),
            Err(_) => Err(StoreError::Timeout(self.io_timeout.as_millis() as u64)),
        }
    }
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push(&self, queue: &str, payload: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.rpush::<_, _, i64>(queue, payload)).await
    }

    async fn length(&self, queue: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.llen::<_, i64>(queue)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_fails_push() {
        // Port 1 is never a Redis server in the test environment.
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let store = RedisQueueStore::new(addr, &RedisConfig::default())
            .unwrap()
            .with_timeouts(Duration::from_millis(300), Duration::from_millis(300));

        let result = store.push("jobs", "{}").await;
        assert!(matches!(
            result,
            Err(StoreError::Connection(_)) | Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_each_caller_independently() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let store = RedisQueueStore::new(addr, &RedisConfig::default())
            .unwrap()
            .with_timeouts(Duration::from_millis(300), Duration::from_millis(300));

        let started = std::time::Instant::now();
        let pushes = (0..5).map(|_| store.push("jobs", "{}"));
        let results = futures_util::future::join_all(pushes).await;

        assert!(results.iter().all(|r| r.is_err()));
        // Serialized attempts would take five connect timeouts.
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
