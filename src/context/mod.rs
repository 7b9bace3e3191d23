//! Request-scoped cancellation.
//!
//! # Data Flow
//! ```text
//! server root context (released on shutdown)
//!     → with_timeout() per inbound request (handler boundary)
//!     → shared by every sub-request of that request
//!     → optional with_timeout() per call (per-call timeout hint)
//! ```
//!
//! # Design Decisions
//! - Contexts are passed explicitly; there is no ambient or thread-local lookup
//! - The first signal wins; later signals are no-ops
//! - Children observe ancestor signals through linked cancellation tokens

pub mod deadline;

pub use deadline::{CancelGuard, ContextError, DeadlineContext};
