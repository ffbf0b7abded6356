//! Flow controller.
//!
//! The action dispatcher of one flow: drives the pure phase machine,
//! executes the single external call per action, rejects overlapping
//! dispatches while a call is outstanding, and absorbs every error into
//! flow state fields.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use kb_core::device::DeviceStatus;
use kb_core::error::FlowError;
use kb_core::flow::{
    DispatchPhase, FlowPatch, FlowState, PhaseEffect, PhaseEvent, PhaseMachine, StepId,
    StepRegistry,
};
use kb_core::ids::{FlowId, SubjectId};
use kb_core::ports::{BackendPort, FlowEventPort, UiPort, UiVisibility};

use crate::flow::action::{ActionOutcome, FlowAction};
use crate::flow::context::FlowContext;

/// The flow has been torn down; no further mutation is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("flow has been torn down")]
pub struct FlowClosed;

/// Orchestrator that drives one flow's state and side effects.
pub struct FlowController {
    id: FlowId,
    subject: SubjectId,
    /// Resource pulled on start and on status-changed events; `None` for
    /// flows without a device status resource.
    status_path: Option<String>,
    context: Arc<FlowContext>,
    registry: StepRegistry,
    backend: Arc<dyn BackendPort>,
    events: Arc<dyn FlowEventPort>,
    ui: Arc<dyn UiPort>,
}

impl FlowController {
    pub fn new(
        subject: SubjectId,
        status_path: Option<String>,
        registry: StepRegistry,
        backend: Arc<dyn BackendPort>,
        events: Arc<dyn FlowEventPort>,
        ui: Arc<dyn UiPort>,
    ) -> Self {
        Self {
            id: FlowId::generate(),
            subject,
            status_path,
            context: FlowContext::default().arc(),
            registry,
            backend,
            events,
            ui,
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn context(&self) -> &Arc<FlowContext> {
        &self.context
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub async fn current(&self) -> FlowState {
        self.context.current().await
    }

    /// Resolves the visible step for the current state.
    pub async fn active_step(&self) -> Option<StepId> {
        self.registry.active(&self.context.current().await)
    }

    /// Executes a named user action: validate, lock, issue the single
    /// external call, apply the outcome.
    ///
    /// The dispatch lock covers the transition and settle sections, never
    /// the call itself. The locked `AwaitingResponse` state is published
    /// before the call goes out, so a second dispatch arriving while a call
    /// is outstanding observes it and is rejected without any call being
    /// made, rather than queueing behind the first.
    pub async fn dispatch(&self, action: &dyn FlowAction) -> Result<FlowState, FlowClosed> {
        let span = info_span!("flow.dispatch", flow = %self.id, action = %action.id());
        async {
            let pending = {
                let _guard = self.context.acquire_dispatch_lock().await;
                if self.context.is_closed() {
                    return Err(FlowClosed);
                }
                let state = self.context.current().await;

                let (phase, effects) = PhaseMachine::transition(
                    state.phase.clone(),
                    PhaseEvent::Dispatch {
                        action: action.id(),
                    },
                );
                let issues_call = effects
                    .iter()
                    .any(|effect| matches!(effect, PhaseEffect::IssueCall { .. }));
                if !issues_call || state.locked {
                    warn!(phase = ?state.phase, locked = state.locked, "dispatch rejected while action pending");
                    return Ok(state);
                }

                if let Err(reason) = action.validate(&state) {
                    info!(error = %reason, "dispatch blocked by local validation");
                    return self.publish(Self::error_patch(&reason)).await;
                }

                self.publish(
                    action
                        .pending_patch()
                        .phase(phase)
                        .locked(true)
                        .aborted(false)
                        .clear_notice(),
                )
                .await?
            };

            let outcome = action.call(self.backend.as_ref(), &pending).await;

            let _guard = self.context.acquire_dispatch_lock().await;
            if self.context.is_closed() {
                return Err(FlowClosed);
            }
            self.settle(action, outcome).await
        }
        .instrument(span)
        .await
    }

    async fn settle(
        &self,
        action: &dyn FlowAction,
        outcome: Result<ActionOutcome, FlowError>,
    ) -> Result<FlowState, FlowClosed> {
        let state = self.context.current().await;
        match outcome {
            Ok(ActionOutcome::Advance { step, patch }) => {
                let (phase, effects) = PhaseMachine::transition(
                    state.phase,
                    PhaseEvent::CallSucceeded { advance_to: step },
                );
                debug!(to = ?phase, "flow action completed");
                let published = self
                    .publish(
                        action
                            .cleanup_patch()
                            .merge(Self::effect_patch(&effects))
                            .merge(patch)
                            .clear_errors()
                            .phase(phase),
                    )
                    .await?;
                self.finish_advance(published).await
            }
            Ok(ActionOutcome::AwaitConfirmation { patch }) => {
                let (phase, _effects) =
                    PhaseMachine::transition(state.phase, PhaseEvent::ConfirmationRequired);
                info!(action = %action.id(), "awaiting confirmation on device");
                self.publish(patch.phase(phase)).await
            }
            Err(reason) => {
                let (phase, effects) = PhaseMachine::transition(
                    state.phase,
                    PhaseEvent::CallFailed {
                        reason: reason.clone(),
                    },
                );
                warn!(error = %reason, "flow action failed");
                self.publish(
                    action
                        .cleanup_patch()
                        .merge(Self::effect_patch(&effects))
                        .phase(phase),
                )
                .await
            }
        }
    }

    /// Resolves an `AwaitingConfirmation` wait from a matching external
    /// event. Duplicate or post-cancel events leave the state untouched.
    pub async fn resolve_confirmation(
        &self,
        success: bool,
        advance_to: Option<StepId>,
        extra: FlowPatch,
    ) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        let state = self.context.current().await;
        let event = if success {
            PhaseEvent::ConfirmationSucceeded { advance_to }
        } else {
            PhaseEvent::ConfirmationFailed
        };
        let (phase, effects) = PhaseMachine::transition(state.phase.clone(), event);
        if phase == state.phase && effects.is_empty() {
            debug!(phase = ?state.phase, "confirmation event ignored");
            return Ok(state);
        }
        info!(success, to = ?phase, "confirmation wait resolved");
        let published = self
            .publish(Self::effect_patch(&effects).merge(extra).phase(phase))
            .await?;
        self.finish_advance(published).await
    }

    /// Cancels a pending confirmation wait. A late matching event after
    /// cancellation is a no-op.
    pub async fn cancel(&self) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        let state = self.context.current().await;
        let (phase, effects) = PhaseMachine::transition(state.phase.clone(), PhaseEvent::Cancel);
        if phase == state.phase && effects.is_empty() {
            return Ok(state);
        }
        info!("confirmation wait cancelled");
        self.publish(Self::effect_patch(&effects).phase(phase)).await
    }

    /// Pulls the device status resource and applies it. A failed pull keeps
    /// the previous status (the designated default before the first pull is
    /// `Unknown`).
    pub async fn refresh_status(&self) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        let Some(path) = self.status_path.as_deref() else {
            return Ok(self.context.current().await);
        };
        match self.backend.get(path).await {
            Ok(value) => match serde_json::from_value::<DeviceStatus>(value) {
                Ok(status) => {
                    let state = self
                        .publish(
                            FlowPatch::new()
                                .status(status)
                                .clear_errors()
                                .clear_notice(),
                        )
                        .await?;
                    info!(status = ?status, "device status updated");
                    self.sync_ui(status).await;
                    Ok(state)
                }
                Err(err) => {
                    warn!(error = %err, "unrecognized device status");
                    Ok(self.context.current().await)
                }
            },
            Err(err) => {
                warn!(error = %err, "status pull failed");
                Ok(self.context.current().await)
            }
        }
    }

    /// Runs a refresh action outside the dispatch lifecycle: no lock, no
    /// phase change, errors logged and dropped.
    pub async fn run_background(&self, action: &dyn FlowAction) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        let state = self.context.current().await;
        match action.call(self.backend.as_ref(), &state).await {
            Ok(ActionOutcome::Advance { patch, .. }) => self.publish(patch).await,
            Ok(ActionOutcome::AwaitConfirmation { .. }) => {
                warn!(action = %action.id(), "background action requested confirmation; ignored");
                Ok(state)
            }
            Err(reason) => {
                debug!(action = %action.id(), error = %reason, "background refresh failed");
                Ok(state)
            }
        }
    }

    /// Applies a bookkeeping patch produced by an event handler.
    pub async fn apply_patch(&self, patch: FlowPatch) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        if patch.is_empty() {
            return Ok(self.context.current().await);
        }
        self.publish(patch).await
    }

    /// Records a user input edit: merges form fields and clears a failed
    /// phase back to idle.
    pub async fn update_fields(&self, patch: FlowPatch) -> Result<FlowState, FlowClosed> {
        let _guard = self.context.acquire_dispatch_lock().await;
        if self.context.is_closed() {
            return Err(FlowClosed);
        }
        let state = self.context.current().await;
        let (phase, _effects) =
            PhaseMachine::transition(state.phase.clone(), PhaseEvent::InputEdited);
        self.publish(patch.phase(phase)).await
    }

    /// Closes the context and restores the surrounding panel when leaving an
    /// initialized device.
    pub async fn teardown(&self) {
        self.context.close();
        let state = self.context.current().await;
        if state.status.is_initialized() {
            if let Err(err) = self.ui.set_visibility(UiVisibility::Full).await {
                warn!(error = %err, "ui restore on teardown failed");
            }
        }
        info!(flow = %self.id, "flow torn down");
    }

    async fn finish_advance(&self, state: FlowState) -> Result<FlowState, FlowClosed> {
        if let DispatchPhase::Advanced { .. } = state.phase {
            let (phase, _effects) = PhaseMachine::transition(state.phase, PhaseEvent::Rendered);
            return self.publish(FlowPatch::new().phase(phase)).await;
        }
        Ok(state)
    }

    async fn publish(&self, patch: FlowPatch) -> Result<FlowState, FlowClosed> {
        let Some(state) = self.context.apply(patch).await else {
            return Err(FlowClosed);
        };
        self.events
            .emit_flow_state_changed(self.id, state.clone())
            .await;
        Ok(state)
    }

    async fn sync_ui(&self, status: DeviceStatus) {
        let mode = if status.restores_panel() {
            UiVisibility::Full
        } else if status.needs_wizard() {
            UiVisibility::Hidden
        } else {
            return;
        };
        if let Err(err) = self.ui.set_visibility(mode).await {
            warn!(error = %err, "ui visibility update failed");
        }
    }

    fn effect_patch(effects: &[PhaseEffect]) -> FlowPatch {
        let mut patch = FlowPatch::new();
        for effect in effects {
            match effect {
                PhaseEffect::ReleaseLock => patch = patch.locked(false),
                PhaseEffect::SurfaceError { reason } => {
                    patch = patch.merge(Self::error_patch(reason));
                }
                PhaseEffect::MarkAborted => patch = patch.aborted(true),
                PhaseEffect::IssueCall { .. } | PhaseEffect::Advance { .. } => {}
            }
        }
        patch
    }

    fn error_patch(reason: &FlowError) -> FlowPatch {
        match reason {
            FlowError::Validation { field, message } => FlowPatch::new().error(field, message),
            FlowError::Request {
                message,
                field: Some(field),
            } => FlowPatch::new().error(field, message),
            FlowError::Request {
                message,
                field: None,
            } => FlowPatch::new().notice(message),
            FlowError::Transport(_) => FlowPatch::new().notice(reason.to_string()),
            FlowError::DeviceAbort => FlowPatch::new().aborted(true),
        }
    }
}
