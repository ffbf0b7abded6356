//! Flow-state change bus for renderers.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use kb_core::flow::FlowState;
use kb_core::ids::FlowId;
use kb_core::ports::FlowEventPort;

/// A flow-state snapshot emitted after every state change.
#[derive(Debug, Clone)]
pub struct FlowStateChanged {
    pub flow: FlowId,
    pub state: FlowState,
}

/// [`FlowEventPort`] over a broadcast channel; renderers subscribe and
/// re-render from each snapshot.
pub struct BroadcastFlowEvents {
    sender: broadcast::Sender<FlowStateChanged>,
}

impl BroadcastFlowEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowStateChanged> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl FlowEventPort for BroadcastFlowEvents {
    async fn emit_flow_state_changed(&self, flow: FlowId, state: FlowState) {
        trace!(%flow, "flow state changed");
        let _ = self.sender.send(FlowStateChanged { flow, state });
    }
}

impl Default for BroadcastFlowEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
