//! Send-coins flow.
//!
//! A three-step wizard over one account: edit the transaction, confirm it on
//! the device while signing is outstanding, then a sent receipt. Every edit
//! invalidates the previous proposal; sending requires a valid proposal.

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Value};
use tracing::debug;

use kb_core::error::FlowError;
use kb_core::event::ExternalEvent;
use kb_core::flow::{ActionId, DispatchPhase, FlowPatch, FlowState, Step, StepId, StepRegistry};
use kb_core::ids::SubjectId;
use kb_core::ports::{BackendPort, FlowEventPort, NotificationPort, UiPort};

use crate::flow::{
    ActionOutcome, EventHandler, FlowAction, FlowController, StatusPoller,
};
use crate::flows::device_error;

pub const STEP_EDIT: StepId = StepId("edit");
pub const STEP_CONFIRM: StepId = StepId("confirm");
pub const STEP_SENT: StepId = StepId("sent");

pub const PROPOSE_TX: ActionId = ActionId("propose-tx");
pub const CONVERT_AMOUNT: ActionId = ActionId("convert-amount");
pub const SEND_TX: ActionId = ActionId("send-tx");
pub const DISMISS_SENT: ActionId = ActionId("dismiss-sent");
pub const CHECK_PAIRED: ActionId = ActionId("check-paired");

const RECIPIENT_ADDRESS: &str = "recipientAddress";
const AMOUNT: &str = "amount";
const AMOUNT_FIAT: &str = "amountFiat";
const FEE_TARGET: &str = "feeTarget";
const SEND_ALL: &str = "sendAll";
const PROPOSED_FEE: &str = "proposedFee";
const PROPOSED_AMOUNT: &str = "proposedAmount";
const PROPOSED_TOTAL: &str = "proposedTotal";
const VALID: &str = "valid";
const IS_SENT: &str = "isSent";
const PAIRED: &str = "paired";

// Backend error texts recognized as field errors, anything else is a notice.
const ERR_INVALID_ADDRESS: &str = "invalid address";
const ERR_INVALID_AMOUNT: &str = "invalid amount";

/// Characters escaped in query string values. The amount is free-form user
/// input, so reserved query characters must not pass through literally.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

fn convert_path(from: &str, to: &str, amount: &str) -> String {
    format!(
        "coins/convert?from={}&to={}&amount={}",
        utf8_percent_encode(from, QUERY_ENCODE),
        utf8_percent_encode(to, QUERY_ENCODE),
        utf8_percent_encode(amount, QUERY_ENCODE),
    )
}

fn signing(state: &FlowState) -> bool {
    matches!(
        &state.phase,
        DispatchPhase::AwaitingResponse { action } if *action == SEND_TX
    )
}

fn is_sent(state: &FlowState) -> bool {
    state.field_bool(IS_SENT) == Some(true)
}

pub fn send_steps() -> StepRegistry {
    StepRegistry::new(vec![
        Step::new(STEP_EDIT, "Send", 10, |s| !is_sent(s) && !signing(s)),
        Step::new(STEP_CONFIRM, "Confirm on device", 20, signing),
        Step::new(STEP_SENT, "Sent", 30, is_sent),
    ])
}

/// Wallet API paths, rooted per account.
#[derive(Clone)]
pub struct WalletApi {
    prefix: String,
}

impl WalletApi {
    pub fn new(account: &SubjectId) -> Self {
        Self {
            prefix: format!("wallet/{}", account),
        }
    }

    fn path(&self, tail: &str) -> String {
        format!("{}/{}", self.prefix, tail)
    }
}

/// Patch applied on every form edit: the previous proposal no longer matches
/// the inputs.
pub fn edit_patch() -> FlowPatch {
    FlowPatch::new()
        .field(VALID, false)
        .clear_field(PROPOSED_FEE)
        .clear_field(PROPOSED_AMOUNT)
        .clear_field(PROPOSED_TOTAL)
}

fn proposal_body(state: &FlowState) -> Value {
    let send_all = state.field_bool(SEND_ALL) == Some(true);
    json!({
        "address": state.field_str(RECIPIENT_ADDRESS).unwrap_or(""),
        "amount": state.field_str(AMOUNT).unwrap_or(""),
        "feeTarget": state.field_str(FEE_TARGET).unwrap_or("economy"),
        "sendAll": if send_all { "yes" } else { "no" },
    })
}

/// Asks the backend to validate the form and build a transaction proposal.
pub struct ProposeTransaction {
    api: WalletApi,
}

#[async_trait]
impl FlowAction for ProposeTransaction {
    fn id(&self) -> ActionId {
        PROPOSE_TX
    }

    fn validate(&self, state: &FlowState) -> Result<(), FlowError> {
        if state.field_str(RECIPIENT_ADDRESS).unwrap_or("").is_empty() {
            return Err(FlowError::validation(
                RECIPIENT_ADDRESS,
                "Please enter an address",
            ));
        }
        let send_all = state.field_bool(SEND_ALL) == Some(true);
        if !send_all && state.field_str(AMOUNT).unwrap_or("").is_empty() {
            return Err(FlowError::validation(AMOUNT, "Please enter an amount"));
        }
        Ok(())
    }

    fn cleanup_patch(&self) -> FlowPatch {
        edit_patch()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(&self.api.path("tx-proposal"), proposal_body(state))
            .await?;
        if !response.success {
            let message = response.error_message_or("Transaction proposal failed");
            return Err(match message.as_str() {
                ERR_INVALID_ADDRESS => FlowError::request_for_field(RECIPIENT_ADDRESS, message),
                ERR_INVALID_AMOUNT => FlowError::request_for_field(AMOUNT, message),
                _ => FlowError::request(message),
            });
        }
        let mut patch = FlowPatch::new().field(VALID, true);
        for (key, field) in [
            (PROPOSED_AMOUNT, "amount"),
            (PROPOSED_FEE, "fee"),
            (PROPOSED_TOTAL, "total"),
        ] {
            if let Some(value) = response.field(field) {
                patch = patch.field(key, value.clone());
            }
        }
        Ok(ActionOutcome::stay(patch))
    }
}

/// Converts an amount between a coin unit and fiat for display next to the
/// amount input.
pub struct ConvertAmount {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[async_trait]
impl FlowAction for ConvertAmount {
    fn id(&self) -> ActionId {
        CONVERT_AMOUNT
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let path = convert_path(&self.from, &self.to, &self.amount);
        let value = backend.get(&path).await?;
        if value.get("success").and_then(Value::as_bool) != Some(true) {
            // A non-numeric amount is not an error worth surfacing; the
            // conversion display just stays empty.
            return Ok(ActionOutcome::stay(FlowPatch::new().clear_field(AMOUNT_FIAT)));
        }
        let converted = value
            .get("amount")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ActionOutcome::stay(FlowPatch::new().field(AMOUNT_FIAT, converted)))
    }
}

/// Signs and broadcasts the proposed transaction. The call blocks through the
/// on-device confirmation; while it is outstanding the confirm step is
/// visible.
pub struct SendTransaction {
    api: WalletApi,
}

#[async_trait]
impl FlowAction for SendTransaction {
    fn id(&self) -> ActionId {
        SEND_TX
    }

    fn validate(&self, state: &FlowState) -> Result<(), FlowError> {
        if state.field_bool(VALID) != Some(true) {
            return Err(FlowError::validation(
                VALID,
                "Review the transaction proposal first",
            ));
        }
        Ok(())
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend.post(&self.api.path("sendtx"), json!({})).await?;
        if !response.success {
            return Err(device_error(response.error_message_or("Sending failed")));
        }
        Ok(ActionOutcome::advance(
            STEP_SENT,
            FlowPatch::new()
                .field(IS_SENT, true)
                .field(VALID, false)
                .clear_field(RECIPIENT_ADDRESS)
                .clear_field(AMOUNT)
                .clear_field(AMOUNT_FIAT)
                .clear_field(SEND_ALL)
                .clear_field(PROPOSED_FEE)
                .clear_field(PROPOSED_AMOUNT)
                .clear_field(PROPOSED_TOTAL),
        ))
    }
}

/// Returns from the sent receipt to a blank form. No backend call.
pub struct DismissSent;

#[async_trait]
impl FlowAction for DismissSent {
    fn id(&self) -> ActionId {
        DISMISS_SENT
    }

    async fn call(
        &self,
        _backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        Ok(ActionOutcome::stay(FlowPatch::new().field(IS_SENT, false)))
    }
}

/// Background pull of the device pairing requirement: an account whose device
/// is unpaired cannot confirm a transaction on it.
struct CheckPaired {
    device_id: String,
}

#[async_trait]
impl FlowAction for CheckPaired {
    fn id(&self) -> ActionId {
        CHECK_PAIRED
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let paired = backend
            .get(&format!("devices/{}/paired", self.device_id))
            .await?
            .as_bool()
            .unwrap_or(false);
        Ok(ActionOutcome::stay(FlowPatch::new().field(PAIRED, paired)))
    }
}

struct SendEvents {
    device_id: String,
}

#[async_trait]
impl EventHandler for SendEvents {
    async fn on_start(&self, controller: &FlowController) -> anyhow::Result<()> {
        controller
            .run_background(&CheckPaired {
                device_id: self.device_id.clone(),
            })
            .await?;
        Ok(())
    }

    async fn handle(
        &self,
        event: &ExternalEvent,
        _controller: &FlowController,
    ) -> anyhow::Result<()> {
        debug!(payload = ?event.data(), "unhandled wallet event");
        Ok(())
    }
}

/// Bundle of the dispatchable actions of one send flow.
pub struct SendActions {
    api: WalletApi,
}

impl SendActions {
    pub fn new(api: WalletApi) -> Self {
        Self { api }
    }

    pub fn propose(&self) -> ProposeTransaction {
        ProposeTransaction {
            api: self.api.clone(),
        }
    }

    pub fn convert(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
    ) -> ConvertAmount {
        ConvertAmount {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
        }
    }

    pub fn send(&self) -> SendTransaction {
        SendTransaction {
            api: self.api.clone(),
        }
    }

    pub fn dismiss_sent(&self) -> DismissSent {
        DismissSent
    }
}

/// Wires up a send flow for one account. The flow has no device status
/// resource of its own; only the paired check touches the device.
pub fn send_flow(
    account: SubjectId,
    device_id: impl Into<String>,
    backend: Arc<dyn BackendPort>,
    flow_events: Arc<dyn FlowEventPort>,
    ui: Arc<dyn UiPort>,
    notifications: Arc<dyn NotificationPort>,
) -> (Arc<FlowController>, SendActions, StatusPoller) {
    let api = WalletApi::new(&account);
    let controller = Arc::new(FlowController::new(
        account,
        None,
        send_steps(),
        backend,
        flow_events,
        ui,
    ));
    let poller = StatusPoller::new(
        controller.clone(),
        notifications,
        Arc::new(SendEvents {
            device_id: device_id.into(),
        }),
    );
    (controller, SendActions::new(api), poller)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_is_the_default_step() {
        let registry = send_steps();
        assert_eq!(registry.active(&FlowState::default()), Some(STEP_EDIT));
    }

    #[test]
    fn test_confirm_shows_while_signing() {
        let registry = send_steps();
        let state = FlowState::default().merged(
            FlowPatch::new().phase(DispatchPhase::AwaitingResponse { action: SEND_TX }),
        );
        assert_eq!(registry.active(&state), Some(STEP_CONFIRM));
    }

    #[test]
    fn test_other_pending_actions_keep_the_edit_step() {
        let registry = send_steps();
        let state = FlowState::default().merged(
            FlowPatch::new().phase(DispatchPhase::AwaitingResponse { action: PROPOSE_TX }),
        );
        assert_eq!(registry.active(&state), Some(STEP_EDIT));
    }

    #[test]
    fn test_sent_receipt_after_broadcast() {
        let registry = send_steps();
        let state = FlowState::default().merged(FlowPatch::new().field(IS_SENT, true));
        assert_eq!(registry.active(&state), Some(STEP_SENT));
    }

    #[test]
    fn test_edit_patch_invalidates_the_proposal() {
        let state = FlowState::default().merged(
            FlowPatch::new()
                .field(VALID, true)
                .field(PROPOSED_FEE, json!({ "amount": "0.0001" })),
        );
        let next = state.merged(edit_patch());
        assert_eq!(next.field_bool(VALID), Some(false));
        assert_eq!(next.field(PROPOSED_FEE), None);
    }

    #[test]
    fn test_convert_path_escapes_the_amount() {
        assert_eq!(
            convert_path("BTC", "USD", "0.5"),
            "coins/convert?from=BTC&to=USD&amount=0.5"
        );
        assert_eq!(
            convert_path("BTC", "USD", "0.5&to=EUR"),
            "coins/convert?from=BTC&to=USD&amount=0.5%26to%3DEUR"
        );
    }

    #[test]
    fn test_proposal_body_defaults() {
        let body = proposal_body(&FlowState::default());
        assert_eq!(body["address"], "");
        assert_eq!(body["feeTarget"], "economy");
        assert_eq!(body["sendAll"], "no");
    }
}
