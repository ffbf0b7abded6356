//! Flow state change notification port.

use async_trait::async_trait;

use crate::flow::FlowState;
use crate::ids::FlowId;

/// Sink for flow state snapshots, consumed by whatever renders the flow.
#[async_trait]
pub trait FlowEventPort: Send + Sync {
    async fn emit_flow_state_changed(&self, flow: FlowId, state: FlowState);
}
