//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start-up (main.rs):
//!     Load config → Validate → Logging → Metrics → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → root context released → in-flight sub-requests abort
//!     → server stops accepting → drains connections → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
