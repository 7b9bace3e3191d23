//! Sub-request orchestration core.
//!
//! # Data Flow
//! ```text
//! handler (one DeadlineContext per inbound request)
//!     → serial.rs      run_serial: calls one by one, fail fast
//!     → concurrent.rs  run_concurrent: all calls at once, collect every outcome
//!         → call.rs    execute: spawn transport call, race against ctx.done()
//!             → transport.rs  Transport::get (hyper client in production)
//! ```
//!
//! # Design Decisions
//! - All calls of one request share a single context; elapsed time erodes the
//!   budget of later serial calls
//! - No retries anywhere in the core
//! - A call never returns while its task is still running

pub mod call;
pub mod concurrent;
pub mod error;
pub mod serial;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

use serde::Serialize;

pub use call::{execute, CallOutcome, CallSpec};
pub use concurrent::run_concurrent;
pub use error::{CallError, SerialError, TransportError};
pub use serial::run_serial;
pub use transport::{HyperTransport, SharedTransport, Transport};

/// Lifecycle of one orchestrated request.
///
/// ```text
/// Pending → Running → { Succeeded, Failed, DeadlineExceeded }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Running,
    Succeeded,
    Failed,
    DeadlineExceeded,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::DeadlineExceeded
        )
    }

    /// Terminal state of a serial run.
    pub fn of_serial<T>(result: &Result<T, SerialError>) -> Self {
        match result {
            Ok(_) => RequestState::Succeeded,
            Err(e) if e.source.is_deadline_exceeded() => RequestState::DeadlineExceeded,
            Err(_) => RequestState::Failed,
        }
    }

    /// Terminal state of a concurrent run. Deadline aborts stay embedded in
    /// the outcomes, so this is never `DeadlineExceeded`.
    pub fn of_concurrent(outcomes: &[CallOutcome]) -> Self {
        if outcomes.iter().all(CallOutcome::is_success) {
            RequestState::Succeeded
        } else {
            RequestState::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Running => "running",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
            RequestState::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;
    use axum::body::Bytes;

    #[test]
    fn serial_state_distinguishes_deadline_from_failure() {
        let ok: Result<(), SerialError> = Ok(());
        assert_eq!(RequestState::of_serial(&ok), RequestState::Succeeded);

        let deadline: Result<(), SerialError> = Err(SerialError {
            index: 1,
            source: ContextError::DeadlineExceeded.into(),
        });
        assert_eq!(RequestState::of_serial(&deadline), RequestState::DeadlineExceeded);

        let transport: Result<(), SerialError> = Err(SerialError {
            index: 0,
            source: TransportError::Request("reset".into()).into(),
        });
        assert_eq!(RequestState::of_serial(&transport), RequestState::Failed);
    }

    #[test]
    fn concurrent_state_embeds_deadlines() {
        let outcomes = [
            CallOutcome::success(0, Bytes::from_static(b"ok")),
            CallOutcome::failure(1, ContextError::DeadlineExceeded.into()),
        ];
        let state = RequestState::of_concurrent(&outcomes);
        assert_eq!(state, RequestState::Failed);
        assert!(state.is_terminal());
        assert!(!RequestState::Running.is_terminal());
    }
}
