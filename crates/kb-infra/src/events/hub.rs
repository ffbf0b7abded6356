//! In-process fan-out of backend notifications.

use tokio::sync::broadcast;
use tracing::debug;

use kb_core::event::ExternalEvent;
use kb_core::ports::NotificationPort;

/// Broadcast hub every flow subscribes to. The transport feeding it (the
/// backend's push channel) publishes each decoded event once; subscribers do
/// their own subject filtering.
pub struct NotificationHub {
    sender: broadcast::Sender<ExternalEvent>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers. An event with no
    /// subscribers is dropped silently.
    pub fn publish(&self, event: ExternalEvent) {
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(delivered, "notification published");
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationPort for NotificationHub {
    fn subscribe(&self) -> broadcast::Receiver<ExternalEvent> {
        self.sender.subscribe()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(64)
    }
}
