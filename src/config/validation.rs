//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Upstream budgets below this are allowed but flagged at startup.
pub const RECOMMENDED_MIN_TIMEOUT_SECS: u64 = 10 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("upstream.endpoint_env must name an environment variable")]
    EmptyEndpointEnv,
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::Zero("listener.max_concurrent_requests"));
    }

    if config.upstream.endpoint_env.trim().is_empty() {
        errors.push(ValidationError::EmptyEndpointEnv);
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }

    if config.limits.max_upload_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_upload_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Log non-fatal configuration concerns.
pub fn warn_on_short_timeout(config: &ProxyConfig) {
    if config.upstream.timeout_secs < RECOMMENDED_MIN_TIMEOUT_SECS {
        tracing::warn!(
            timeout_secs = config.upstream.timeout_secs,
            recommended_min_secs = RECOMMENDED_MIN_TIMEOUT_SECS,
            "Upstream timeout is shorter than long transcription jobs may need"
        );
    }
}
