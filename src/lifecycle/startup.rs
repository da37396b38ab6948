//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (metrics reporter, queue depth watcher)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shared state is built here and injected; nothing is global
//! - Background tasks are joined before the process exits

use chrono::Utc;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{GatewayConfig, ResolvedAddresses};
use crate::http::{AppState, HttpServer};
use crate::idgen::{machine_id_for, GenerationError, IdGenerator};
use crate::lifecycle::shutdown::{Shutdown, ShutdownError, ShutdownState};
use crate::lifecycle::signals;
use crate::observability::recorder;
use crate::observability::reporter::MetricsReporter;
use crate::observability::Metrics;
use crate::publish::Publisher;
use crate::queue::{QueueDepthWatcher, QueueStore, RedisQueueStore, StoreError, WatchedQueueSet};

/// Errors that prevent the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("id generator: {0}")]
    Ids(#[from] GenerationError),

    #[error("queue store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("prometheus exporter: {0}")]
    Exporter(String),
}

/// A fully wired gateway, ready to serve.
pub struct Gateway {
    config: GatewayConfig,
    metrics: Arc<Metrics>,
    watched: Arc<WatchedQueueSet>,
    store: Arc<dyn QueueStore>,
    server: HttpServer,
}

impl Gateway {
    /// Wire the gateway against the Redis server in `addrs`.
    pub fn connect(config: GatewayConfig, addrs: &ResolvedAddresses) -> Result<Self, StartupError> {
        tracing::info!(address = %addrs.redis, "Preparing Redis connection");
        let store = RedisQueueStore::new(addrs.redis, &config.redis)?;
        Self::new(config, Some(addrs.bind), Arc::new(store))
    }

    /// Wire the gateway against any queue store.
    pub fn new(
        config: GatewayConfig,
        bind: Option<SocketAddr>,
        store: Arc<dyn QueueStore>,
    ) -> Result<Self, StartupError> {
        let metrics = Arc::new(Metrics::new());
        let watched = Arc::new(WatchedQueueSet::new());

        let machine_id = machine_id_for(config.ids.machine_id, bind);
        let ids = Arc::new(IdGenerator::new(
            machine_id,
            Duration::from_millis(config.ids.max_clock_backward_ms),
        )?);
        tracing::debug!(machine_id, "Id generator ready");

        let mut publisher = Publisher::new(ids, store.clone(), metrics.clone());
        if config.watcher.enabled {
            let now = Utc::now();
            for queue in &config.watcher.queues {
                watched.touch(queue, now);
            }
            publisher = publisher.with_watched(watched.clone());
        }

        let state = AppState::new(Arc::new(publisher), metrics.clone(), &config);
        let server = HttpServer::new(&config, state);

        Ok(Self {
            config,
            metrics,
            watched,
            store,
            server,
        })
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn watched(&self) -> Arc<WatchedQueueSet> {
        self.watched.clone()
    }

    /// Serve on `listener` until `shutdown` fires and the drain completes.
    pub async fn serve(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ShutdownError> {
        let mut tasks = Vec::new();

        if self.config.observability.verbose {
            let reporter = MetricsReporter::new(
                self.metrics.clone(),
                Duration::from_secs(self.config.observability.report_interval_secs),
            );
            tasks.extend(spawn_until_shutdown(&shutdown, |rx| reporter.run(rx)));
        }

        if self.config.watcher.enabled {
            let watcher = QueueDepthWatcher::new(
                self.store.clone(),
                self.watched.clone(),
                self.metrics.clone(),
                Duration::from_secs(self.config.watcher.interval_secs),
                self.config.redis.io_timeout(),
            );
            tasks.extend(spawn_until_shutdown(&shutdown, |rx| watcher.run(rx)));
        }

        let result = self.server.run(listener, shutdown.clone()).await;

        // The server may also stop on its own; background loops must end either way.
        shutdown.trigger();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task failed");
            }
        }

        result
    }
}

/// Spawn a background loop unless shutdown has already begun.
fn spawn_until_shutdown<F, Fut>(shutdown: &Shutdown, task: F) -> Option<JoinHandle<()>>
where
    F: FnOnce(broadcast::Receiver<()>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    // Subscribe before checking the state so a trigger in between is not lost.
    let rx = shutdown.subscribe();
    if shutdown.state() != ShutdownState::Running {
        return None;
    }
    Some(tokio::spawn(task(rx)))
}

/// Start the gateway from a validated configuration and run it to completion.
///
/// Returns an error only for startup failures; a drain error is logged.
pub async fn run(config: GatewayConfig, addrs: ResolvedAddresses) -> Result<(), StartupError> {
    if let Some(addr) = addrs.prometheus {
        recorder::init_prometheus(addr).map_err(|e| StartupError::Exporter(e.to_string()))?;
    }

    let gateway = Gateway::connect(config, &addrs)?;

    let listener = TcpListener::bind(addrs.bind)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addrs.bind,
            source,
        })?;

    let shutdown = Shutdown::new();
    signals::listen(shutdown.clone());

    match gateway.serve(listener, shutdown).await {
        Ok(()) => tracing::info!("HTTP server Shutdown complete"),
        Err(e) => tracing::error!(error = %e, "HTTP server Shutdown"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueueStore;

    #[tokio::test]
    async fn test_watch_list_seeded_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.watcher.queues = vec!["jobs".to_string()];

        let gateway = Gateway::new(config.clone(), None, Arc::new(MemoryQueueStore::new())).unwrap();
        assert!(gateway.watched().is_empty());

        config.watcher.enabled = true;
        let gateway = Gateway::new(config, None, Arc::new(MemoryQueueStore::new())).unwrap();
        assert!(gateway.watched().last_seen("jobs").is_some());
    }

    #[tokio::test]
    async fn test_serve_stops_background_tasks() {
        let mut config = GatewayConfig::default();
        config.observability.verbose = true;
        config.watcher.enabled = true;

        let gateway = Gateway::new(config, None, Arc::new(MemoryQueueStore::new())).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();

        let handle = tokio::spawn(gateway.serve(listener, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("gateway did not stop")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(shutdown.state(), ShutdownState::Stopped);
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
