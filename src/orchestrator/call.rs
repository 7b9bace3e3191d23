//! Cancellable call: one outbound request raced against a context.
//!
//! # Race Resolution
//! ```text
//! spawn(transport.get) ──result──▶ oneshot ─┐
//!                                            ├─ select (channel polled first)
//! ctx.done() ───────────────────────────────┘
//!
//! channel first → return the delivered result
//! ctx first     → abort task → await it → delivered result if it raced in,
//!                 otherwise the context error
//! ```
//!
//! The call never returns while its task is still running, so no outbound
//! request outlives the orchestrator that issued it.

use std::time::Duration;

use axum::body::Bytes;
use tokio::sync::oneshot;
use tokio_util::task::AbortOnDropHandle;
use url::Url;

use super::error::CallError;
use super::transport::SharedTransport;
use crate::context::{ContextError, DeadlineContext};

/// One outbound call: where to send it and an optional tighter timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    pub target: Url,
    pub timeout: Option<Duration>,
}

impl CallSpec {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            timeout: None,
        }
    }

    /// Bound this call by `timeout` in addition to the shared deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of one call, stamped with its position among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub index: usize,
    pub result: Result<Bytes, CallError>,
}

impl CallOutcome {
    pub fn success(index: usize, payload: Bytes) -> Self {
        Self {
            index,
            result: Ok(payload),
        }
    }

    pub fn failure(index: usize, error: CallError) -> Self {
        Self {
            index,
            result: Err(error),
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CallError> {
        self.result.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `spec` on its own task and race it against `ctx`.
///
/// Dropping the returned future aborts the task as well.
pub async fn execute(
    ctx: &DeadlineContext,
    transport: &SharedTransport,
    index: usize,
    spec: &CallSpec,
) -> CallOutcome {
    // Keeps the per-call child alive (and releases it) for the whole race.
    let (call_ctx, _call_guard) = match spec.timeout {
        Some(timeout) => {
            let (child, guard) = DeadlineContext::with_timeout(ctx, timeout);
            (child, Some(guard))
        }
        None => (ctx.clone(), None),
    };

    tracing::debug!(index, target = %spec.target, remaining = ?call_ctx.remaining(), "Starting sub-request");

    let (tx, mut rx) = oneshot::channel();
    let task = {
        let transport = SharedTransport::clone(transport);
        let target = spec.target.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            let result = transport.get(&target).await;
            let _ = tx.send(result);
        }))
    };

    let result = tokio::select! {
        biased;

        delivered = &mut rx => {
            // Sender dropped without a value: the task died mid-call.
            let joined = task.await;
            match delivered {
                Ok(result) => result.map_err(CallError::from),
                Err(_) => {
                    tracing::error!(index, error = ?joined.err(), "Sub-request task ended without a result");
                    Err(CallError::Panicked)
                }
            }
        }

        () = call_ctx.done() => {
            task.abort();
            let _ = task.await;

            match rx.try_recv() {
                Ok(result) => result.map_err(CallError::from),
                Err(_) => {
                    let cause = call_ctx.err().unwrap_or(ContextError::Cancelled);
                    tracing::debug!(index, error = %cause, "Sub-request aborted");
                    Err(CallError::from(cause))
                }
            }
        }
    };

    match &result {
        Ok(payload) => tracing::debug!(index, bytes = payload.len(), "Sub-request returned"),
        Err(error) => tracing::debug!(index, error = %error, "Sub-request failed"),
    }

    CallOutcome { index, result }
}
