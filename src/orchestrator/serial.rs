//! Serial orchestration: one call after another under one shared deadline.
//!
//! Time spent by earlier calls erodes the budget of later ones. The first
//! failure ends the run and earlier payloads are discarded.

use axum::body::Bytes;

use super::call::{execute, CallSpec};
use super::error::SerialError;
use super::transport::SharedTransport;
use crate::context::DeadlineContext;

/// Run `specs` in order against `ctx`, returning payloads in input order.
///
/// Call N+1 is never started before call N has returned. A call whose turn
/// comes after the context is done is not launched.
pub async fn run_serial(
    ctx: &DeadlineContext,
    transport: &SharedTransport,
    specs: &[CallSpec],
) -> Result<Vec<Bytes>, SerialError> {
    let mut payloads = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        if let Some(cause) = ctx.err() {
            tracing::debug!(index, error = %cause, "Context done before sub-request could start");
            return Err(SerialError {
                index,
                source: cause.into(),
            });
        }

        let outcome = execute(ctx, transport, index, spec).await;
        match outcome.result {
            Ok(payload) => payloads.push(payload),
            Err(source) => {
                tracing::debug!(index, error = %source, "Serial run stopped at first failure");
                return Err(SerialError { index, source });
            }
        }
    }

    Ok(payloads)
}
