use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use kb_core::flow::{FlowPatch, FlowState};

/// Shared flow context containing state, dispatch lock, and lifecycle flag.
///
/// ## Lock ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: serializes the read-transition-publish sections of a
///   dispatch cycle. It is never held across an action's external call; the
///   published locked phase is what rejects overlapping dispatches while a
///   call is outstanding.
/// - `state`: guards reads (`current`) and writes (`apply`).
pub struct FlowContext {
    state: Mutex<FlowState>,
    dispatch_lock: Mutex<()>,
    /// Once set, no further state mutation is possible. Pending calls and
    /// late events resolving after teardown become no-ops instead of
    /// corrupting a successor flow.
    closed: AtomicBool,
}

impl FlowContext {
    pub fn new(initial_state: FlowState) -> Self {
        Self {
            state: Mutex::new(initial_state),
            dispatch_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Snapshot of the current state. Does NOT acquire `dispatch_lock`.
    pub async fn current(&self) -> FlowState {
        self.state.lock().await.clone()
    }

    /// Acquires the dispatch lock; the guard releases it when dropped.
    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Merges the patch into the state and returns the new state, or `None`
    /// when the context has been closed.
    pub async fn apply(&self, patch: FlowPatch) -> Option<FlowState> {
        if self.is_closed() {
            return None;
        }
        let mut guard = self.state.lock().await;
        let next = guard.merged(patch);
        *guard = next.clone();
        Some(next)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new(FlowState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_core::device::DeviceStatus;

    #[tokio::test]
    async fn test_apply_merges_into_state() {
        let context = FlowContext::default();
        let next = context
            .apply(FlowPatch::new().status(DeviceStatus::Connected))
            .await
            .unwrap();
        assert_eq!(next.status, DeviceStatus::Connected);
        assert_eq!(context.current().await, next);
    }

    #[tokio::test]
    async fn test_apply_after_close_is_noop() {
        let context = FlowContext::default();
        context.close();

        let result = context
            .apply(FlowPatch::new().status(DeviceStatus::Connected))
            .await;
        assert!(result.is_none());
        assert_eq!(context.current().await.status, DeviceStatus::Unknown);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let context = FlowContext::default();
        context.close();
        context.close();
        assert!(context.is_closed());
    }
}
