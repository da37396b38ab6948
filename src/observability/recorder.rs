//! `metrics` facade instrumentation and the optional Prometheus exporter.
//!
//! The publish path always emits facade events; they only go somewhere when
//! [`init_prometheus`] has installed a recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const PUBLISH_TOTAL: &str = "taskq_publisher_publish_total";
pub const PUSH_DURATION: &str = "taskq_publisher_push_duration_seconds";

/// Install the global Prometheus recorder with an HTTP listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(PUBLISH_TOTAL, "Publish attempts by outcome");
    metrics::describe_histogram!(
        PUSH_DURATION,
        metrics::Unit::Seconds,
        "Time spent pushing one payload to the queue store"
    );

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Count one finished publish attempt.
pub fn record_publish(outcome: &'static str) {
    metrics::counter!(PUBLISH_TOTAL, "outcome" => outcome).increment(1);
}

/// Record the duration of one queue push.
pub fn record_push_duration(elapsed: Duration) {
    metrics::histogram!(PUSH_DURATION).record(elapsed.as_secs_f64());
}
