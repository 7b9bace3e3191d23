//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use humantime_serde::Serde;
use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Sub-request targets used by the fan-out endpoints.
    pub subrequests: SubrequestConfig,

    /// Logging back end selection.
    pub logging: LoggingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outer bound on any inbound request, in seconds.
    pub request_secs: u64,

    /// Connection establishment timeout for sub-requests.
    #[serde(with = "humantime_serde")]
    pub connect: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect: Duration::from_secs(2),
        }
    }
}

/// Sub-request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubrequestConfig {
    /// Base URL under which `slow/get` is reached.
    pub base_url: String,

    /// Delays for the serial endpoint, one call per entry.
    pub serial_delays: Vec<Serde<Duration>>,

    /// Delays for the concurrent endpoint, one call per entry.
    pub concurrent_delays: Vec<Serde<Duration>>,

    /// Largest sub-request response body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for SubrequestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            serial_delays: vec![
                Duration::from_millis(500).into(),
                Duration::from_millis(500).into(),
            ],
            concurrent_delays: vec![
                Duration::from_millis(500).into(),
                Duration::from_millis(750).into(),
            ],
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Where log events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogBackend {
    /// Human-readable lines on stderr.
    #[default]
    Stderr,
    /// JSON lines on stdout for a platform log collector.
    Managed,
    /// Discard everything.
    Noop,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub backend: LogBackend,

    /// Default level (trace, debug, info, warn, error); `RUST_LOG` overrides.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            backend: LogBackend::Stderr,
            level: "info".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
