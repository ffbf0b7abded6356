use async_trait::async_trait;

use kb_core::error::FlowError;
use kb_core::flow::{ActionId, FlowPatch, FlowState, StepId};
use kb_core::ports::BackendPort;

/// Result of an action's external call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The call completed; merge the patch and optionally advance the
    /// wizard.
    Advance {
        step: Option<StepId>,
        patch: FlowPatch,
    },
    /// The call established a wait for physical device confirmation; the
    /// flow stays locked until a matching external event or cancellation.
    AwaitConfirmation { patch: FlowPatch },
}

impl ActionOutcome {
    pub fn stay(patch: FlowPatch) -> Self {
        Self::Advance { step: None, patch }
    }

    pub fn advance(step: StepId, patch: FlowPatch) -> Self {
        Self::Advance {
            step: Some(step),
            patch,
        }
    }
}

/// A named user-triggered action.
///
/// The dispatcher validates local preconditions, locks the flow, lets the
/// action issue its single external call, and applies the outcome. Actions
/// whose precondition is already satisfied may complete without any call.
#[async_trait]
pub trait FlowAction: Send + Sync {
    fn id(&self) -> ActionId;

    /// Local precondition check; runs before any external call.
    fn validate(&self, _state: &FlowState) -> Result<(), FlowError> {
        Ok(())
    }

    /// Patch applied together with the lock, before the call is issued.
    /// Used for wait-dialog copy shown while the call is outstanding.
    fn pending_patch(&self) -> FlowPatch {
        FlowPatch::new()
    }

    /// Patch applied when the call completes, success or failure. The
    /// outcome patch wins on conflicts.
    fn cleanup_patch(&self) -> FlowPatch {
        FlowPatch::new()
    }

    /// Issues the action's external call.
    async fn call(
        &self,
        backend: &dyn BackendPort,
        state: &FlowState,
    ) -> Result<ActionOutcome, FlowError>;
}
