//! Configuration validation.
//!
//! # Responsibilities
//! - Resolve listener, Redis and exporter addresses
//! - Validate value ranges (intervals and timeouts > 0)
//! - Keep the Redis timeouts inside the request timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before anything is bound or connected; any error is fatal

use std::net::{SocketAddr, ToSocketAddrs};
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: cannot resolve address {value:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error(
        "redis.connect_timeout_secs + redis.io_timeout_secs ({store_secs}) must be \
         less than listener.request_timeout_secs ({request_secs})"
    )]
    StoreExceedsRequest { store_secs: u64, request_secs: u64 },
}

/// Addresses resolved from a validated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddresses {
    pub bind: SocketAddr,
    pub redis: SocketAddr,
    pub prometheus: Option<SocketAddr>,
}

/// Validate `config` and resolve its addresses.
pub fn validate_config(config: &GatewayConfig) -> Result<ResolvedAddresses, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = resolve("listener.bind_address", &config.listener.bind_address, &mut errors);
    let redis = resolve("redis.address", &config.redis.address, &mut errors);
    let prometheus = config
        .observability
        .prometheus_address
        .as_deref()
        .map(|addr| resolve("observability.prometheus_address", addr, &mut errors));

    let positive = [
        ("listener.request_timeout_secs", config.listener.request_timeout_secs),
        ("redis.connect_timeout_secs", config.redis.connect_timeout_secs),
        ("redis.io_timeout_secs", config.redis.io_timeout_secs),
        ("watcher.interval_secs", config.watcher.interval_secs),
        ("observability.report_interval_secs", config.observability.report_interval_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let store_secs = config
        .redis
        .connect_timeout_secs
        .saturating_add(config.redis.io_timeout_secs);
    if store_secs >= config.listener.request_timeout_secs {
        errors.push(ValidationError::StoreExceedsRequest {
            store_secs,
            request_secs: config.listener.request_timeout_secs,
        });
    }

    match (bind, redis, prometheus) {
        (Some(bind), Some(redis), None) if errors.is_empty() => Ok(ResolvedAddresses {
            bind,
            redis,
            prometheus: None,
        }),
        (Some(bind), Some(redis), Some(Some(prometheus))) if errors.is_empty() => {
            Ok(ResolvedAddresses {
                bind,
                redis,
                prometheus: Some(prometheus),
            })
        }
        _ => Err(errors),
    }
}

/// Resolve `value` to a socket address, preferring IPv4.
fn resolve(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) -> Option<SocketAddr> {
    let invalid = |reason: String| ValidationError::InvalidAddress {
        field,
        value: value.to_string(),
        reason,
    };

    match value.to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            let chosen = addrs
                .iter()
                .find(|addr| addr.is_ipv4())
                .or_else(|| addrs.first())
                .copied();
            if chosen.is_none() {
                errors.push(invalid("no addresses found".to_string()));
            }
            chosen
        }
        Err(e) => {
            errors.push(invalid(e.to_string()));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let resolved = validate_config(&GatewayConfig::default()).unwrap();
        assert_eq!(resolved.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(resolved.redis, "127.0.0.1:6379".parse().unwrap());
        assert!(resolved.prometheus.is_none());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "no-port-here".to_string();
        config.redis.address = "127.0.0.1:notaport".to_string();
        config.watcher.interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            errors[0],
            ValidationError::InvalidAddress { field: "listener.bind_address", .. }
        ));
        assert!(matches!(
            errors[1],
            ValidationError::InvalidAddress { field: "redis.address", .. }
        ));
        assert_eq!(errors[2], ValidationError::Zero { field: "watcher.interval_secs" });
    }

    #[test]
    fn test_store_timeouts_must_fit_request_timeout() {
        let mut config = GatewayConfig::default();
        config.redis.connect_timeout_secs = 5;
        config.redis.io_timeout_secs = 5;
        config.listener.request_timeout_secs = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::StoreExceedsRequest {
                store_secs: 10,
                request_secs: 10,
            }]
        );

        config.listener.request_timeout_secs = 11;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_exporter_address_is_rejected() {
        let mut config = GatewayConfig::default();
        config.observability.prometheus_address = Some("bogus".to_string());
        assert_eq!(validate_config(&config).unwrap_err().len(), 1);

        config.observability.prometheus_address = Some("127.0.0.1:9090".to_string());
        let resolved = validate_config(&config).unwrap();
        assert_eq!(resolved.prometheus, Some("127.0.0.1:9090".parse().unwrap()));
    }
}
