//! Sub-request error classification.

use thiserror::Error;

use crate::context::ContextError;

/// Failure reported by a [`Transport`](super::Transport), surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The target could not be turned into an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, DNS, or protocol failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be read in full.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Classified failure of a single cancellable call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The call's task ended without delivering a result.
    #[error("sub-request task panicked")]
    Panicked,
}

impl CallError {
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, CallError::Context(ContextError::DeadlineExceeded))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::Context(ContextError::DeadlineExceeded) => "deadline_exceeded",
            CallError::Context(ContextError::Cancelled) => "cancelled",
            CallError::Transport(_) => "transport",
            CallError::Panicked => "panicked",
        }
    }
}

/// First failure of a serial run. Payloads of earlier calls are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sub-request {index} failed: {source}")]
pub struct SerialError {
    /// Input position of the failing call.
    pub index: usize,
    pub source: CallError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_errors_display_like_the_signal() {
        let err = CallError::from(ContextError::DeadlineExceeded);
        assert_eq!(err.to_string(), "context deadline exceeded");
        assert!(err.is_deadline_exceeded());
        assert_eq!(err.kind(), "deadline_exceeded");

        let err = CallError::from(ContextError::Cancelled);
        assert_eq!(err.to_string(), "context canceled");
        assert!(!err.is_deadline_exceeded());
    }

    #[test]
    fn transport_errors_are_verbatim() {
        let err = CallError::from(TransportError::Request("connection refused".into()));
        assert_eq!(err.to_string(), "request failed: connection refused");
        assert_eq!(err.kind(), "transport");
    }
}
