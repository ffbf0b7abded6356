//! Flow domain module.
//!
//! Defines the flow state record and patch semantics, the pure dispatcher
//! phase machine, and the step registry that resolves the visible step.

pub mod phase;
pub mod state;
pub mod step;

pub use phase::{ActionId, DispatchPhase, PhaseEffect, PhaseEvent, PhaseMachine};
pub use state::{FlowPatch, FlowState};
pub use step::{Step, StepId, StepRegistry};
