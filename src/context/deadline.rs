//! Deadline-carrying cancellation context.
//!
//! A [`DeadlineContext`] carries a one-shot cancellation signal and an
//! optional absolute deadline through a call tree. Any holder may wait on
//! [`DeadlineContext::done`]; only the [`CancelGuard`] returned at creation
//! (and the deadline timer it owns) can trigger it.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context was signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context's (or an ancestor's) deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The context (or an ancestor) was released explicitly.
    #[error("context canceled")]
    Cancelled,
}

/// Cancellation signal plus deadline, cheap to clone and share across tasks.
#[derive(Debug, Clone)]
pub struct DeadlineContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    reason: OnceLock<ContextError>,
    parent: Option<DeadlineContext>,
}

impl DeadlineContext {
    /// Root context. It has no deadline and is never signalled.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline: None,
                reason: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derive a child that is signalled after `timeout`, when the returned
    /// guard is released, or when `parent` is signalled, whichever is first.
    ///
    /// Must be called within a Tokio runtime: the deadline timer runs as a
    /// task that exits as soon as the context is signalled.
    pub fn with_timeout(parent: &DeadlineContext, timeout: Duration) -> (Self, CancelGuard) {
        let own = Instant::now().checked_add(timeout);
        let deadline = match (own, parent.deadline()) {
            (Some(own), Some(inherited)) => Some(own.min(inherited)),
            (own, inherited) => own.or(inherited),
        };

        let ctx = parent.child(deadline);

        // An ancestor's timer already covers anything at or past its deadline.
        if let Some(own) = own {
            if parent.deadline().map_or(true, |inherited| own < inherited) {
                spawn_deadline_timer(ctx.clone(), own);
            }
        }

        let guard = CancelGuard { ctx: ctx.clone() };
        (ctx, guard)
    }

    /// Derive a child that is signalled only by its guard or by `parent`.
    pub fn with_cancel(parent: &DeadlineContext) -> (Self, CancelGuard) {
        let ctx = parent.child(parent.deadline());
        let guard = CancelGuard { ctx: ctx.clone() };
        (ctx, guard)
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                deadline,
                reason: OnceLock::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Resolves once the context has been signalled.
    pub async fn done(&self) {
        self.inner.token.cancelled().await
    }

    /// `None` until signalled, then the reason. A child signalled through its
    /// parent reports the parent's reason.
    pub fn err(&self) -> Option<ContextError> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }
        self.inner.parent.as_ref().and_then(DeadlineContext::err)
    }

    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Effective deadline: the earliest of this context's and its ancestors'.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Budget left before the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Record `reason` and wake every waiter. Only the first call has effect.
    fn signal(&self, reason: ContextError) {
        // Signalled through an ancestor: keep reporting the ancestor's reason.
        if self.inner.token.is_cancelled() {
            return;
        }
        if self.inner.reason.set(reason).is_ok() {
            self.inner.token.cancel();
        }
    }
}

fn spawn_deadline_timer(ctx: DeadlineContext, at: Instant) {
    let token = ctx.inner.token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep_until(at) => ctx.signal(ContextError::DeadlineExceeded),
            _ = token.cancelled() => {}
        }
    });
}

/// Releases its context on [`CancelGuard::release`] or on drop.
///
/// Dropping covers every exit path of the creator, including early returns,
/// panics, and a handler future dropped because the client hung up.
#[derive(Debug)]
#[must_use = "dropping the guard releases the context immediately"]
pub struct CancelGuard {
    ctx: DeadlineContext,
}

impl CancelGuard {
    /// Signal the context as cancelled. Safe to call repeatedly; never blocks.
    pub fn release(&self) {
        self.ctx.signal(ContextError::Cancelled);
    }

    pub fn context(&self) -> &DeadlineContext {
        &self.ctx
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_signals_deadline_exceeded() {
        let root = DeadlineContext::background();
        let (ctx, _guard) = DeadlineContext::with_timeout(&root, Duration::from_millis(700));
        let start = Instant::now();

        assert!(!ctx.is_done());
        assert_eq!(ctx.err(), None);

        ctx.done().await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(705),
            "{elapsed:?}"
        );
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert!(!root.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn release_is_idempotent() {
        let root = DeadlineContext::background();
        let (ctx, guard) = DeadlineContext::with_timeout(&root, Duration::from_secs(5));

        guard.release();
        guard.release();
        assert!(ctx.is_done());
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));

        // The deadline passing later does not change the recorded reason.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_deadline_keeps_deadline_reason() {
        let root = DeadlineContext::background();
        let (ctx, guard) = DeadlineContext::with_timeout(&root, Duration::from_millis(10));
        ctx.done().await;

        guard.release();
        drop(guard);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn dropping_guard_cancels() {
        let root = DeadlineContext::background();
        let (ctx, guard) = DeadlineContext::with_cancel(&root);
        drop(guard);

        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn child_deadline_is_capped_by_parent() {
        let root = DeadlineContext::background();
        let (parent, _parent_guard) =
            DeadlineContext::with_timeout(&root, Duration::from_millis(300));
        let (child, _child_guard) =
            DeadlineContext::with_timeout(&parent, Duration::from_secs(10));

        assert_eq!(child.deadline(), parent.deadline());

        let start = Instant::now();
        child.done().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(305),
            "{elapsed:?}"
        );
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_child_deadline_leaves_parent_running() {
        let root = DeadlineContext::background();
        let (parent, _parent_guard) = DeadlineContext::with_timeout(&root, Duration::from_secs(1));
        let (child, _child_guard) =
            DeadlineContext::with_timeout(&parent, Duration::from_millis(100));

        child.done().await;
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
        assert!(!parent.is_done());
        let remaining = parent.remaining().unwrap();
        assert!(remaining > Duration::from_millis(895) && remaining <= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn parent_release_reaches_children() {
        let root = DeadlineContext::background();
        let (parent, parent_guard) = DeadlineContext::with_cancel(&root);
        let (child, child_guard) = DeadlineContext::with_cancel(&parent);

        parent_guard.release();
        child.done().await;
        assert_eq!(child.err(), Some(ContextError::Cancelled));

        // Releasing the child afterwards is a no-op.
        child_guard.release();
        assert_eq!(child.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signallers_record_one_reason() {
        let root = DeadlineContext::background();
        let (ctx, guard) = DeadlineContext::with_timeout(&root, Duration::from_millis(1));
        let guard = Arc::new(guard);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let guard = Arc::clone(&guard);
            tasks.push(tokio::spawn(async move { guard.release() }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        ctx.done().await;
        let first = ctx.err().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(ctx.err(), Some(first));
    }

    #[test]
    fn background_is_never_done() {
        let root = DeadlineContext::background();
        assert!(!root.is_done());
        assert_eq!(root.err(), None);
        assert_eq!(root.deadline(), None);
        assert_eq!(root.remaining(), None);
    }
}
