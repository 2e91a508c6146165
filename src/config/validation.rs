//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, endpoint URIs and origins
//! - Validate value ranges (attempts >= 1, sizes > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("backend.endpoint '{0}' is not a valid URI with a host")]
    Endpoint(String),

    #[error("backend.connect_timeout_secs must be greater than 0")]
    ConnectTimeout,

    #[error("backend.dial_attempts must be at least 1")]
    DialAttempts,

    #[error("limits.max_body_size must be greater than 0")]
    MaxBodySize,

    #[error("cors.allowed_origins entry '{0}' is not a valid origin")]
    CorsOrigin(String),

    #[error("observability.log_level '{0}' is not a valid level")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Prefix `http://` when the endpoint has no scheme.
pub fn normalize_endpoint(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let endpoint_ok = Url::parse(&normalize_endpoint(&config.backend.endpoint))
        .map(|url| url.host().is_some())
        .unwrap_or(false);
    if !endpoint_ok {
        errors.push(ValidationError::Endpoint(config.backend.endpoint.clone()));
    }
    if config.backend.connect_timeout_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }
    if config.backend.dial_attempts == 0 {
        errors.push(ValidationError::DialAttempts);
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }

    for origin in &config.cors.allowed_origins {
        let valid = origin == "*" || Url::parse(origin).map(|u| u.host().is_some()).unwrap_or(false);
        if !valid {
            errors.push(ValidationError::CorsOrigin(origin.clone()));
        }
    }

    if tracing::Level::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
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
