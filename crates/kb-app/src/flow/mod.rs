//! Generic flow controller machinery.
//!
//! A flow is one instantiation of the wizard controller for a single
//! external subject. The controller dispatches user actions, the poller
//! feeds external events in, and the context owns the state with a guarded
//! lifecycle.

mod action;
mod context;
mod controller;
mod handler;
mod poller;

pub use action::{ActionOutcome, FlowAction};
pub use context::FlowContext;
pub use controller::{FlowClosed, FlowController};
pub use handler::EventHandler;
pub use poller::{FlowHandle, StatusPoller};
