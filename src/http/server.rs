//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout)
//! - Serve on a bound listener until shutdown, then drain

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::{Shutdown, ShutdownError};
use crate::observability::Metrics;
use crate::publish::Publisher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<Publisher>,
    pub metrics: Arc<Metrics>,
    pub metrics_prefix: Arc<str>,
    pub max_body_bytes: usize,
    /// Bound on reading a `/put` body.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(publisher: Arc<Publisher>, metrics: Arc<Metrics>, config: &GatewayConfig) -> Self {
        Self {
            publisher,
            metrics,
            metrics_prefix: config.observability.metrics_prefix.as_str().into(),
            max_body_bytes: config.listener.max_body_bytes,
            request_timeout: Duration::from_secs(config.listener.request_timeout_secs),
        }
    }
}

/// HTTP server for the publisher gateway.
pub struct HttpServer {
    router: Router,
    grace: Option<Duration>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
            grace: config.shutdown.grace_period(),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `/put` is outside the timeout layer; its body read is bounded in the
    /// handler and the publish always runs to completion.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/metrics", get(handlers::metrics))
            .route_layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .route("/put", post(handlers::put))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Serve until `shutdown` fires, then stop accepting and wait for
    /// in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ShutdownError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Listening");

        let drain = wait_for(&shutdown);
        let serve = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(drain)
            .into_future();

        let result = match self.grace {
            None => serve.await.map_err(ShutdownError::from),
            Some(grace) => {
                let deadline = wait_for(&shutdown);
                tokio::pin!(serve);
                tokio::select! {
                    res = &mut serve => res.map_err(ShutdownError::from),
                    _ = async move {
                        deadline.await;
                        tokio::time::sleep(grace).await;
                    } => Err(ShutdownError::GraceExpired(grace)),
                }
            }
        };

        shutdown.mark_stopped();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Future resolving when shutdown is triggered.
fn wait_for(shutdown: &Shutdown) -> impl std::future::Future<Output = ()> + Send + 'static {
    let shutdown = shutdown.clone();
    let rx = shutdown.subscribe();
    async move { shutdown.wait(rx).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::IdGenerator;
    use crate::queue::MemoryQueueStore;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn router(config: &GatewayConfig) -> (Router, Arc<Metrics>, Arc<MemoryQueueStore>) {
        let metrics = Arc::new(Metrics::new());
        let store = Arc::new(MemoryQueueStore::new());
        let ids = Arc::new(IdGenerator::new(3, Duration::from_secs(1)).unwrap());
        let publisher = Arc::new(Publisher::new(ids, store.clone(), metrics.clone()));
        let state = AppState::new(publisher, metrics.clone(), config);
        (HttpServer::build_router(config, state), metrics, store)
    }

    #[tokio::test]
    async fn test_oversized_body_counts_as_error() {
        let mut config = GatewayConfig::default();
        config.listener.max_body_bytes = 16;
        let (router, metrics, store) = router(&config);

        let request = Request::post("/put")
            .body(Body::from(r#"{"channel":"jobs","payload":"far too long"}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.put_requests, 1);
        assert_eq!(snapshot.errors, 1);
        assert!(store.items("jobs").is_empty());
    }

    #[tokio::test]
    async fn test_get_on_put_route_is_rejected() {
        let (router, metrics, _store) = router(&GatewayConfig::default());

        let request = Request::get("/put").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(metrics.snapshot().put_requests, 0);
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let (router, _metrics, _store) = router(&GatewayConfig::default());

        let request = Request::get("/").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert!(response.headers().contains_key(X_REQUEST_ID));
    }
}
