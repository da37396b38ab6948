//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Publish path / index handler / watcher:
//!     → metrics.rs (atomic counters, queue lengths)
//!     → recorder.rs (metrics facade, optional Prometheus exporter)
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → exposition.rs (GET /metrics text body)
//!     → reporter.rs (periodic debug log of all counters)
//! ```
//!
//! # Design Decisions
//! - Counters are atomic increments; no lock on the request path
//! - The aggregator is injected, never a global
//! - Log format is JSON unless configured otherwise

pub mod exposition;
pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod reporter;

pub use metrics::{Metrics, MetricsSnapshot};
