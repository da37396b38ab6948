//! Route handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::cli;
use crate::http::server::AppState;
use crate::observability::exposition;
use crate::publish::{DecodeError, PublishOutcome};

impl IntoResponse for PublishOutcome {
    fn into_response(self) -> Response {
        match self {
            PublishOutcome::Ok => StatusCode::OK.into_response(),
            PublishOutcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// `GET /`: identity string.
pub async fn index(State(state): State<AppState>) -> String {
    state.metrics.incr_index();
    cli::identity()
}

/// `POST /put`: publish one payload. Failures return a bare 500.
pub async fn put(State(state): State<AppState>, body: Body) -> PublishOutcome {
    tracing::info!("Processing incoming request");

    let read = axum::body::to_bytes(body, state.max_body_bytes);
    let raw = match tokio::time::timeout(state.request_timeout, read).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => return state.publisher.reject(DecodeError::Body(e.to_string())),
        Err(_) => {
            let elapsed = format!("timed out after {:?}", state.request_timeout);
            return state.publisher.reject(DecodeError::Body(elapsed));
        }
    };

    // Detached so a dropped connection cannot abandon the push or its counters.
    let publisher = state.publisher.clone();
    match tokio::spawn(async move { publisher.handle(&raw).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Publish task failed");
            state.metrics.incr_error();
            PublishOutcome::InternalError
        }
    }
}

/// `GET /metrics`: text exposition of the aggregator.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = exposition::render(&state.metrics_prefix, &state.metrics.snapshot());
    ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body)
}
