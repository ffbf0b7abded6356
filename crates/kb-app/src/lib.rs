//! # kb-app
//!
//! Use-case layer of Keybridge: the flow controller (action dispatcher), the
//! status poller bridging backend push notifications into flow state, and
//! the concrete flows of the companion app.

pub mod flow;
pub mod flows;

pub use flow::{
    ActionOutcome, EventHandler, FlowAction, FlowClosed, FlowContext, FlowController, FlowHandle,
    StatusPoller,
};
