//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, names, and value ranges
//! - Reject protocol overrides that name no known protocol
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::uri::Authority;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::protocol::RpcType;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address '{0}'")]
    BindAddress(String),

    #[error("invalid upstream address '{0}'")]
    UpstreamAddress(String),

    #[error("instance name must be non-empty and contain no '/', got '{0}'")]
    InstanceName(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unknown protocol '{0}' in protocols.disabled")]
    UnknownProtocol(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if Authority::from_str(&config.upstream.address).is_err() {
        errors.push(ValidationError::UpstreamAddress(config.upstream.address.clone()));
    }

    let name = &config.instance.name;
    if name.is_empty() || name.contains('/') {
        errors.push(ValidationError::InstanceName(name.clone()));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::Zero("cache.ttl_secs"));
    }
    if config.cache.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("cache.max_body_bytes"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    for protocol in &config.protocols.disabled {
        if protocol.parse::<RpcType>().is_err() {
            errors.push(ValidationError::UnknownProtocol(protocol.clone()));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
