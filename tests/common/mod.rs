//! Shared utilities for integration and load testing.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use taskq_publisher::config::GatewayConfig;
use taskq_publisher::lifecycle::{Gateway, Shutdown, ShutdownError};
use taskq_publisher::observability::Metrics;
use taskq_publisher::queue::{MemoryQueueStore, QueueStore, StoreError};

/// A gateway served on an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub metrics: Arc<Metrics>,
    pub handle: JoinHandle<Result<(), ShutdownError>>,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway over `store` on 127.0.0.1 with a random port.
pub async fn start_gateway(config: GatewayConfig, store: Arc<dyn QueueStore>) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let gateway = Gateway::new(config, Some(addr), store).unwrap();
    let metrics = gateway.metrics();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(gateway.serve(listener, shutdown.clone()));

    TestGateway {
        addr,
        shutdown,
        metrics,
        handle,
    }
}

/// Start a gateway over a fresh in-memory store.
#[allow(dead_code)]
pub async fn start_memory_gateway() -> (TestGateway, Arc<MemoryQueueStore>) {
    let store = Arc::new(MemoryQueueStore::new());
    let gateway = start_gateway(GatewayConfig::default(), store.clone()).await;
    (gateway, store)
}

/// Non-pooled client that ignores proxy settings from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Store that holds every push for `delay` before appending.
#[allow(dead_code)]
pub struct SlowStore {
    pub inner: MemoryQueueStore,
    pub delay: Duration,
}

#[async_trait]
impl QueueStore for SlowStore {
    async fn push(&self, queue: &str, payload: &str) -> Result<i64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.push(queue, payload).await
    }

    async fn length(&self, queue: &str) -> Result<i64, StoreError> {
        self.inner.length(queue).await
    }
}
