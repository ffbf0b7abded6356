//! Event loop binding one flow to the backend notification stream.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use kb_core::ports::NotificationPort;

use crate::flow::controller::FlowController;
use crate::flow::handler::EventHandler;

/// Subscribes a flow to backend notifications and drives its event handler.
pub struct StatusPoller {
    controller: Arc<FlowController>,
    notifications: Arc<dyn NotificationPort>,
    handler: Arc<dyn EventHandler>,
}

impl StatusPoller {
    pub fn new(
        controller: Arc<FlowController>,
        notifications: Arc<dyn NotificationPort>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            controller,
            notifications,
            handler,
        }
    }

    /// Subscribes, pulls the initial status, runs the handler's start hook,
    /// and spawns the event loop. Subscription happens before the initial
    /// pull so a status change racing the pull is not lost.
    pub async fn start(self) -> FlowHandle {
        let Self {
            controller,
            notifications,
            handler,
        } = self;
        let mut rx = notifications.subscribe();

        if let Err(err) = controller.refresh_status().await {
            warn!(error = %err, "initial status pull on a closed flow");
        }
        if let Err(err) = handler.on_start(controller.as_ref()).await {
            warn!(error = %err, "flow start hook failed");
        }

        let span = info_span!("flow.events", flow = %controller.id());
        let loop_controller = controller.clone();
        let task = tokio::spawn(
            async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            if !event.concerns(loop_controller.subject()) {
                                continue;
                            }
                            if let Err(err) =
                                handler.handle(&event, loop_controller.as_ref()).await
                            {
                                warn!(error = %err, "event handler failed");
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "notification stream lagged");
                        }
                        Err(RecvError::Closed) => {
                            debug!("notification stream closed");
                            break;
                        }
                    }
                }
            }
            .instrument(span),
        );

        FlowHandle { controller, task }
    }
}

/// Owner handle of a running flow; tears the flow down when dropped.
pub struct FlowHandle {
    controller: Arc<FlowController>,
    task: JoinHandle<()>,
}

impl FlowHandle {
    pub fn controller(&self) -> &Arc<FlowController> {
        &self.controller
    }

    /// Graceful teardown: closes the flow, restores the panel if the device
    /// ended up initialized, and stops the event loop.
    pub async fn shutdown(self) {
        self.controller.teardown().await;
        self.task.abort();
    }
}

impl Drop for FlowHandle {
    fn drop(&mut self) {
        self.controller.context().close();
        self.task.abort();
    }
}
