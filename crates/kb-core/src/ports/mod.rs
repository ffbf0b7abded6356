//! Ports implemented by the outer layers.

pub mod backend;
pub mod flow_event;
pub mod notifications;
pub mod ui;

pub use backend::{BackendPort, BackendResponse, TransportError};
pub use flow_event::FlowEventPort;
pub use notifications::NotificationPort;
pub use ui::{UiPort, UiVisibility};
