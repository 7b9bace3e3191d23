//! Shutdown coordination for the service.

use tokio::sync::broadcast;

use crate::context::{CancelGuard, DeadlineContext};

/// Coordinator for graceful shutdown.
///
/// Owns the root [`DeadlineContext`] every request context derives from, plus
/// a broadcast channel that long-running tasks can subscribe to. Triggering
/// cancels every in-flight orchestration and tells the server to stop.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    /// Released on trigger; cancels all derived request contexts.
    root: CancelGuard,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        let (_, root) = DeadlineContext::with_cancel(&DeadlineContext::background());
        Self { tx, root }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Root context for request contexts.
    pub fn context(&self) -> DeadlineContext {
        self.root.context().clone()
    }

    /// Trigger the shutdown signal. Only the first trigger notifies
    /// subscribers; later ones are no-ops.
    pub fn trigger(&self) {
        if self.is_triggered() {
            return;
        }
        self.root.release();
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.root.context().is_done()
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
