//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the default target is an absolute http(s) URL with a host
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target URL scheme must be http or https, got `{0}`")]
    UnsupportedScheme(String),

    #[error("target URL `{0}` has no host")]
    MissingHost(String),

    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },

    #[error("metrics address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = &config.default_target_url;
    if !matches!(target.scheme(), "http" | "https") {
        errors.push(ValidationError::UnsupportedScheme(target.scheme().to_string()));
    }
    if target.host_str().map_or(true, str::is_empty) {
        errors.push(ValidationError::MissingHost(target.to_string()));
    }

    let non_zero = [
        ("listen_port", config.listen_port as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.response_secs", config.timeouts.response_secs),
        ("limits.max_html_body_bytes", config.limits.max_html_body_bytes as u64),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
