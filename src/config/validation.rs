//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and the sub-request base URL
//! - Validate value ranges (timeouts > 0, delay lists non-empty)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("subrequests.base_url: {0}")]
    InvalidBaseUrl(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    match Url::parse(&config.subrequests.base_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::InvalidBaseUrl(format!(
            "unsupported scheme {:?}, expected http",
            url.scheme()
        ))),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBaseUrl(e.to_string())),
    }

    if config.subrequests.serial_delays.is_empty() {
        errors.push(ValidationError::Empty("subrequests.serial_delays"));
    }
    if config.subrequests.concurrent_delays.is_empty() {
        errors.push(ValidationError::Empty("subrequests.concurrent_delays"));
    }
    if config.subrequests.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("subrequests.max_body_bytes"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
