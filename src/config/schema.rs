//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::Deserialize;
use std::time::Duration;

use crate::observability::logging::LogFormat;

/// Root configuration for the publisher gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Redis queue store settings.
    pub redis: RedisConfig,

    /// Queue depth watching.
    pub watcher: WatcherConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Id generator settings.
    pub ids: IdConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Upper bound on the time to serve one request, in seconds. For `/put`
    /// this bounds the body read; the push is bounded by the Redis timeouts.
    pub request_timeout_secs: u64,

    /// Largest accepted `/put` body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 10,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server address (e.g., "127.0.0.1:6379").
    pub address: String,

    /// Optional AUTH password.
    pub password: Option<String>,

    /// Logical database index.
    pub db: i64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-command timeout in seconds.
    pub io_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
            connect_timeout_secs: 3,
            io_timeout_secs: 5,
        }
    }
}

impl RedisConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// Queue depth watcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Record published channels and sample their length. Off by default.
    pub enabled: bool,

    /// Sampling interval in seconds.
    pub interval_secs: u64,

    /// Channels watched from startup.
    pub queues: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
            queues: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Debug logging plus the periodic metrics reporter.
    pub verbose: bool,

    /// Log line format.
    pub log_format: LogFormat,

    /// Interval of the periodic metrics reporter in seconds.
    pub report_interval_secs: u64,

    /// Name prefix of the `/metrics` families.
    pub metrics_prefix: String,

    /// Optional bind address of a dedicated Prometheus exporter.
    pub prometheus_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: LogFormat::Json,
            report_interval_secs: 60,
            metrics_prefix: "taskq_publisher".to_string(),
            prometheus_address: None,
        }
    }
}

/// Id generator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// Fixed machine id; derived from the bind address when unset.
    pub machine_id: Option<u16>,

    /// Largest clock regression absorbed before id generation fails, in ms.
    pub max_clock_backward_ms: u64,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            machine_id: None,
            max_clock_backward_ms: 1000,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Bound on the drain phase in seconds. Unset waits for in-flight
    /// requests without a deadline.
    pub grace_secs: Option<u64>,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Option<Duration> {
        self.grace_secs.map(Duration::from_secs)
    }
}
