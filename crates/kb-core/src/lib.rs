//! # kb-core
//!
//! Core domain models for the Keybridge flow controller.
//!
//! This crate contains pure business logic without any infrastructure
//! dependencies: the device lifecycle model, the flow state and its patch
//! semantics, the step registry, the dispatcher phase machine, and the port
//! traits implemented by the outer layers.

pub mod device;
pub mod error;
pub mod event;
pub mod flow;
pub mod ids;
pub mod ports;

// Re-export commonly used types at the crate root
pub use device::DeviceStatus;
pub use error::FlowError;
pub use event::{EventCategory, ExternalEvent};
pub use flow::{
    ActionId, DispatchPhase, FlowPatch, FlowState, PhaseEffect, PhaseEvent, PhaseMachine, Step,
    StepId, StepRegistry,
};
pub use ids::{FlowId, SubjectId};
