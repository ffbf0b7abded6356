//! Event subscription port.

use tokio::sync::broadcast;

use crate::event::ExternalEvent;

/// Broadcast channel of external events.
///
/// The channel is a shared read-only resource; each flow holds its own
/// receiver and filters by subject. Dropping the receiver is the
/// deregistration.
pub trait NotificationPort: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ExternalEvent>;
}
