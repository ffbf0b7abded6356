//! Dispatcher phase machine.
//!
//! A pure state transition function for the action-dispatch lifecycle of a
//! flow. The function never performs side effects itself; it returns the
//! effects the orchestrator must execute.

use serde::Serialize;

use crate::error::FlowError;
use crate::flow::step::StepId;

/// Identity of a dispatchable action within a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActionId(pub &'static str);

impl ActionId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Phase of the action dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum DispatchPhase {
    /// No external action in flight.
    #[default]
    Idle,
    /// Exactly one backend call is outstanding.
    AwaitingResponse { action: ActionId },
    /// Waiting for the user to confirm on the physical device. Cleared only
    /// by a matching external event or explicit cancellation, never a timeout.
    AwaitingConfirmation { action: ActionId },
    /// A call or confirmation just succeeded and the renderer has not yet
    /// shown the next step.
    Advanced { step: StepId },
    /// The last action failed; cleared when the user edits input or
    /// re-dispatches.
    Failed { action: ActionId, reason: FlowError },
}

impl DispatchPhase {
    /// Whether a new dispatch may start from this phase.
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Events that drive the dispatcher phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// User triggered an action that passed local validation.
    Dispatch { action: ActionId },
    /// The outstanding call returned successfully.
    CallSucceeded { advance_to: Option<StepId> },
    /// The outstanding call failed.
    CallFailed { reason: FlowError },
    /// The outstanding call established a wait for physical confirmation.
    ConfirmationRequired,
    /// The backend reported that a confirmation is required without a local
    /// call in flight.
    DeviceActionRequired { action: ActionId },
    /// A matching external event resolved the confirmation wait.
    ConfirmationSucceeded { advance_to: Option<StepId> },
    /// A matching external event reported the user aborted on the device.
    ConfirmationFailed,
    /// User cancelled the confirmation wait.
    Cancel,
    /// User edited an input while in the failed phase.
    InputEdited,
    /// The renderer has shown the advanced step.
    Rendered,
}

/// Side effects the orchestrator must execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEffect {
    /// Issue the single backend call for this dispatch.
    IssueCall { action: ActionId },
    /// Release the flow lock.
    ReleaseLock,
    /// Surface the error into flow state fields.
    SurfaceError { reason: FlowError },
    /// Mark the distinct device-abort indicator.
    MarkAborted,
    /// Advance the wizard to the given step.
    Advance { step: StepId },
}

/// Pure dispatcher phase machine. Unmatched combinations leave the phase
/// unchanged with no effects, which makes duplicate confirmation events and
/// post-cancel stragglers no-ops.
pub struct PhaseMachine;

impl PhaseMachine {
    pub fn transition(phase: DispatchPhase, event: PhaseEvent) -> (DispatchPhase, Vec<PhaseEffect>) {
        match (phase, event) {
            (DispatchPhase::Idle, PhaseEvent::Dispatch { action })
            | (DispatchPhase::Failed { .. }, PhaseEvent::Dispatch { action }) => (
                DispatchPhase::AwaitingResponse { action },
                vec![PhaseEffect::IssueCall { action }],
            ),
            (DispatchPhase::Idle, PhaseEvent::DeviceActionRequired { action }) => {
                (DispatchPhase::AwaitingConfirmation { action }, Vec::new())
            }
            (DispatchPhase::AwaitingResponse { .. }, PhaseEvent::CallSucceeded { advance_to }) => {
                match advance_to {
                    Some(step) => (
                        DispatchPhase::Advanced { step },
                        vec![PhaseEffect::ReleaseLock, PhaseEffect::Advance { step }],
                    ),
                    None => (DispatchPhase::Idle, vec![PhaseEffect::ReleaseLock]),
                }
            }
            // A user abort on the device is not a retryable request failure;
            // it lands back in idle with the abort marker, the same as an
            // abort during a confirmation wait.
            (
                DispatchPhase::AwaitingResponse { .. },
                PhaseEvent::CallFailed {
                    reason: FlowError::DeviceAbort,
                },
            ) => (
                DispatchPhase::Idle,
                vec![PhaseEffect::ReleaseLock, PhaseEffect::MarkAborted],
            ),
            (DispatchPhase::AwaitingResponse { action }, PhaseEvent::CallFailed { reason }) => (
                DispatchPhase::Failed {
                    action,
                    reason: reason.clone(),
                },
                vec![PhaseEffect::ReleaseLock, PhaseEffect::SurfaceError { reason }],
            ),
            (DispatchPhase::AwaitingResponse { action }, PhaseEvent::ConfirmationRequired) => {
                (DispatchPhase::AwaitingConfirmation { action }, Vec::new())
            }
            (
                DispatchPhase::AwaitingConfirmation { .. },
                PhaseEvent::ConfirmationSucceeded { advance_to },
            ) => match advance_to {
                Some(step) => (
                    DispatchPhase::Advanced { step },
                    vec![PhaseEffect::ReleaseLock, PhaseEffect::Advance { step }],
                ),
                None => (DispatchPhase::Idle, vec![PhaseEffect::ReleaseLock]),
            },
            (DispatchPhase::AwaitingConfirmation { .. }, PhaseEvent::ConfirmationFailed) => (
                DispatchPhase::Idle,
                vec![PhaseEffect::ReleaseLock, PhaseEffect::MarkAborted],
            ),
            (DispatchPhase::AwaitingConfirmation { .. }, PhaseEvent::Cancel) => {
                (DispatchPhase::Idle, vec![PhaseEffect::ReleaseLock])
            }
            (DispatchPhase::Advanced { .. }, PhaseEvent::Rendered) => {
                (DispatchPhase::Idle, Vec::new())
            }
            (DispatchPhase::Failed { .. }, PhaseEvent::InputEdited) => {
                (DispatchPhase::Idle, Vec::new())
            }
            (phase, _event) => (phase, Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTION: ActionId = ActionId("set-password");
    const STEP: StepId = StepId("create-backup");

    #[test]
    fn test_dispatch_from_idle_issues_exactly_one_call() {
        let (next, effects) =
            PhaseMachine::transition(DispatchPhase::Idle, PhaseEvent::Dispatch { action: ACTION });
        assert_eq!(next, DispatchPhase::AwaitingResponse { action: ACTION });
        assert_eq!(effects, vec![PhaseEffect::IssueCall { action: ACTION }]);
    }

    #[test]
    fn test_dispatch_while_awaiting_response_is_rejected_without_call() {
        let phase = DispatchPhase::AwaitingResponse { action: ACTION };
        let (next, effects) =
            PhaseMachine::transition(phase.clone(), PhaseEvent::Dispatch { action: ACTION });
        assert_eq!(next, phase);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_dispatch_while_awaiting_confirmation_is_rejected() {
        let phase = DispatchPhase::AwaitingConfirmation { action: ACTION };
        let (next, effects) =
            PhaseMachine::transition(phase.clone(), PhaseEvent::Dispatch { action: ACTION });
        assert_eq!(next, phase);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_success_with_advance_goes_through_advanced_then_idle() {
        let phase = DispatchPhase::AwaitingResponse { action: ACTION };
        let (next, effects) = PhaseMachine::transition(
            phase,
            PhaseEvent::CallSucceeded {
                advance_to: Some(STEP),
            },
        );
        assert_eq!(next, DispatchPhase::Advanced { step: STEP });
        assert_eq!(
            effects,
            vec![PhaseEffect::ReleaseLock, PhaseEffect::Advance { step: STEP }]
        );

        let (next, effects) = PhaseMachine::transition(next, PhaseEvent::Rendered);
        assert_eq!(next, DispatchPhase::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_failure_unlocks_and_surfaces_error() {
        let reason = FlowError::request("nope");
        let phase = DispatchPhase::AwaitingResponse { action: ACTION };
        let (next, effects) = PhaseMachine::transition(
            phase,
            PhaseEvent::CallFailed {
                reason: reason.clone(),
            },
        );
        assert_eq!(
            next,
            DispatchPhase::Failed {
                action: ACTION,
                reason: reason.clone()
            }
        );
        assert_eq!(
            effects,
            vec![
                PhaseEffect::ReleaseLock,
                PhaseEffect::SurfaceError { reason }
            ]
        );
    }

    #[test]
    fn test_failed_clears_on_input_edit() {
        let phase = DispatchPhase::Failed {
            action: ACTION,
            reason: FlowError::request("nope"),
        };
        let (next, effects) = PhaseMachine::transition(phase, PhaseEvent::InputEdited);
        assert_eq!(next, DispatchPhase::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_device_abort_during_call_returns_to_idle_marked_aborted() {
        let phase = DispatchPhase::AwaitingResponse { action: ACTION };
        let (next, effects) = PhaseMachine::transition(
            phase,
            PhaseEvent::CallFailed {
                reason: FlowError::DeviceAbort,
            },
        );
        assert_eq!(next, DispatchPhase::Idle);
        assert_eq!(effects, vec![PhaseEffect::ReleaseLock, PhaseEffect::MarkAborted]);
    }

    #[test]
    fn test_confirmation_abort_returns_to_idle_marked_aborted() {
        let phase = DispatchPhase::AwaitingConfirmation { action: ACTION };
        let (next, effects) = PhaseMachine::transition(phase, PhaseEvent::ConfirmationFailed);
        assert_eq!(next, DispatchPhase::Idle);
        assert_eq!(effects, vec![PhaseEffect::ReleaseLock, PhaseEffect::MarkAborted]);
    }

    #[test]
    fn test_cancel_releases_wait_without_advancing() {
        let phase = DispatchPhase::AwaitingConfirmation { action: ACTION };
        let (next, effects) = PhaseMachine::transition(phase, PhaseEvent::Cancel);
        assert_eq!(next, DispatchPhase::Idle);
        assert_eq!(effects, vec![PhaseEffect::ReleaseLock]);
    }

    #[test]
    fn test_duplicate_confirmation_event_is_noop() {
        // First event resolves the wait.
        let phase = DispatchPhase::AwaitingConfirmation { action: ACTION };
        let (next, _) = PhaseMachine::transition(
            phase,
            PhaseEvent::ConfirmationSucceeded {
                advance_to: Some(STEP),
            },
        );
        let (next, _) = PhaseMachine::transition(next, PhaseEvent::Rendered);
        assert_eq!(next, DispatchPhase::Idle);

        // A duplicate of the same event changes nothing.
        let (next, effects) = PhaseMachine::transition(
            next,
            PhaseEvent::ConfirmationSucceeded {
                advance_to: Some(STEP),
            },
        );
        assert_eq!(next, DispatchPhase::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_post_cancel_confirmation_event_is_ignored() {
        let phase = DispatchPhase::AwaitingConfirmation { action: ACTION };
        let (next, _) = PhaseMachine::transition(phase, PhaseEvent::Cancel);
        let (next, effects) = PhaseMachine::transition(
            next,
            PhaseEvent::ConfirmationSucceeded {
                advance_to: Some(STEP),
            },
        );
        assert_eq!(next, DispatchPhase::Idle);
        assert!(effects.is_empty());
    }
}
