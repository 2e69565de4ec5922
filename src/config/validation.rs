//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field rules.
//! Validation is a pure function that reports every violation, not just the first.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Smallest read buffer hyper accepts for an HTTP/1 connection.
pub const MIN_HEADER_BYTES: usize = 8192;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host '{0}' is not an IP address")]
    InvalidHost(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("listener.max_header_bytes must be at least 8192, got {0}")]
    HeaderLimitTooSmall(usize),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost(listener.host.clone()));
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }
    if listener.max_header_bytes < MIN_HEADER_BYTES {
        errors.push(ValidationError::HeaderLimitTooSmall(listener.max_header_bytes));
    }

    let timeouts = [
        ("listener.header_read_timeout_secs", listener.header_read_timeout_secs),
        ("listener.drain_timeout_secs", listener.drain_timeout_secs),
        ("transport.connect_secs", config.transport.connect_secs),
        ("transport.response_header_secs", config.transport.response_header_secs),
        ("transport.request_secs", config.transport.request_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
