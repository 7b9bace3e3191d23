//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events through `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr, a platform log collector (JSON on stdout), or nothing
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Back end chosen once at start-up; code never checks which one is active
//! - Request ID and remaining deadline ride on the request span
//! - Logging never blocks or fails an orchestration

pub mod logging;
pub mod metrics;
