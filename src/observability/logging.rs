//! Structured logging.
//!
//! # Responsibilities
//! - Install the logging back end chosen in configuration, once, at start-up
//! - Configure log level from config, overridable through `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; the rest of the crate only
//!   talks to the `tracing` macros
//! - Pretty format on stderr for development, JSON on stdout when a platform
//!   collector manages the logs, nothing at all for `noop`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogBackend, LoggingConfig};

pub use tracing_subscriber::util::TryInitError;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("deadline_fanout={level},tower_http={level}").into()
    })
}

/// Install the global subscriber for `config.backend`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    match config.backend {
        LogBackend::Stderr => tracing_subscriber::registry()
            .with(env_filter(&config.level))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogBackend::Managed => tracing_subscriber::registry()
            .with(env_filter(&config.level))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        LogBackend::Noop => Ok(()),
    }
}
