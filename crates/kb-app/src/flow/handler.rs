use async_trait::async_trait;

use kb_core::event::ExternalEvent;

use crate::flow::controller::FlowController;

/// Flow-specific reaction to external backend events.
///
/// Handlers run on the poller task, one event at a time, and mutate flow
/// state only through the controller.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// One-time work after the initial status pull, before any event is
    /// handled. Typically seeds pulled values such as the pairing hash.
    async fn on_start(&self, _controller: &FlowController) -> anyhow::Result<()> {
        Ok(())
    }

    async fn handle(
        &self,
        event: &ExternalEvent,
        controller: &FlowController,
    ) -> anyhow::Result<()>;
}
