//! # kb-infra
//!
//! Infrastructure adapters behind the kb-core ports: the HTTP backend
//! client, the in-process notification hub, the flow-state event bus, and a
//! logging UI bridge for headless runs.

pub mod events;
pub mod http;
pub mod ui;

pub use events::{BroadcastFlowEvents, NotificationHub};
pub use http::HttpBackend;
pub use ui::LoggingUi;
