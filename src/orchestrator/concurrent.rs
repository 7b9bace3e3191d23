//! Concurrent orchestration: every call at once under one shared deadline.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::call::{execute, CallOutcome, CallSpec};
use super::error::CallError;
use super::transport::SharedTransport;
use crate::context::DeadlineContext;

/// Launch every spec against `ctx` and wait for all of them.
///
/// Returns exactly one outcome per spec, ordered by input position. Failures,
/// including deadline aborts, are embedded per index; nothing short-circuits.
/// Dropping the future aborts every launched call.
pub async fn run_concurrent(
    ctx: &DeadlineContext,
    transport: &SharedTransport,
    specs: &[CallSpec],
) -> Vec<CallOutcome> {
    let mut calls = JoinSet::new();
    for (index, spec) in specs.iter().cloned().enumerate() {
        let ctx = ctx.clone();
        let transport = Arc::clone(transport);
        calls.spawn(async move { execute(&ctx, &transport, index, &spec).await });
    }

    let mut slots: Vec<Option<CallOutcome>> = (0..specs.len()).map(|_| None).collect();
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok(outcome) => {
                if let Some(slot) = slots.get_mut(outcome.index) {
                    *slot = Some(outcome);
                }
            }
            Err(e) => tracing::error!(error = %e, "Sub-request task failed before reporting"),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| CallOutcome::failure(index, CallError::Panicked)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{slow_spec, SlowTransport};
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    #[tokio::test(start_paused = true)]
    async fn outcomes_are_reordered_by_input_index() {
        let slow = Arc::new(SlowTransport::default());
        let transport: SharedTransport = slow.clone();
        let root = DeadlineContext::background();
        let (ctx, _guard) = DeadlineContext::with_timeout(&root, Duration::from_secs(1));
        // Completion order is the reverse of input order.
        let specs = [slow_spec("300ms"), slow_spec("200ms"), slow_spec("100ms")];
        let start = Instant::now();

        let outcomes = run_concurrent(&ctx, &transport, &specs).await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(305),
            "{elapsed:?}"
        );
        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(outcomes[0].payload().unwrap().as_ref(), b"delayed 300ms");
        assert_eq!(outcomes[2].payload().unwrap().as_ref(), b"delayed 100ms");
        assert_eq!(slow.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_are_cut_at_the_shared_deadline() {
        let slow = Arc::new(SlowTransport::default());
        let transport: SharedTransport = slow.clone();
        let root = DeadlineContext::background();
        let (ctx, _guard) = DeadlineContext::with_timeout(&root, Duration::from_millis(700));
        let start = Instant::now();

        let outcomes =
            run_concurrent(&ctx, &transport, &[slow_spec("500ms"), slow_spec("750ms")]).await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(705),
            "{elapsed:?}"
        );
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].payload().unwrap().as_ref(), b"delayed 500ms");
        assert!(outcomes[1].error().unwrap().is_deadline_exceeded());
        assert_eq!(slow.started(), 2);
        assert_eq!(slow.in_flight(), 0, "no call may outlive the orchestrator");
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_fails_under_a_tiny_deadline() {
        let slow = Arc::new(SlowTransport::default());
        let transport: SharedTransport = slow.clone();
        let root = DeadlineContext::background();
        let (ctx, _guard) = DeadlineContext::with_timeout(&root, Duration::from_millis(400));

        let outcomes =
            run_concurrent(&ctx, &transport, &[slow_spec("500ms"), slow_spec("750ms")]).await;

        assert!(outcomes.iter().all(|o| o.error().unwrap().is_deadline_exceeded()));
        assert_eq!(slow.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_failures_do_not_short_circuit() {
        let slow = Arc::new(SlowTransport::default());
        let transport: SharedTransport = slow.clone();
        let root = DeadlineContext::background();
        let failing = CallSpec::new(Url::parse("http://backend.test/fail").unwrap());

        let outcomes =
            run_concurrent(&root, &transport, &[failing, slow_spec("200ms")]).await;

        assert_eq!(outcomes[0].error().unwrap().kind(), "transport");
        assert!(outcomes[1].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_run_aborts_all_calls() {
        let slow = Arc::new(SlowTransport::default());
        let transport: SharedTransport = slow.clone();
        let root = DeadlineContext::background();
        let specs = [slow_spec("1s"), slow_spec("2s")];

        let dropped =
            tokio::time::timeout(Duration::from_millis(100), run_concurrent(&root, &transport, &specs))
                .await;
        assert!(dropped.is_err());

        for _ in 0..20 {
            if slow.in_flight() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(slow.in_flight(), 0);
    }
}
