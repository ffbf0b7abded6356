//! Application settings flow.
//!
//! A single-panel flow over the backend config resource. The frontend config
//! and backend config live under two top-level keys of one document; updates
//! are shallow merges under those keys so concurrent writers do not clobber
//! unrelated settings.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use kb_core::error::FlowError;
use kb_core::event::ExternalEvent;
use kb_core::flow::{ActionId, FlowPatch, FlowState, Step, StepId, StepRegistry};
use kb_core::ids::SubjectId;
use kb_core::ports::{BackendPort, FlowEventPort, NotificationPort, UiPort};

use crate::flow::{
    ActionOutcome, EventHandler, FlowAction, FlowController, StatusPoller,
};

pub const STEP_SETTINGS: StepId = StepId("settings");

pub const LOAD_CONFIG: ActionId = ActionId("load-config");
pub const UPDATE_CONFIG: ActionId = ActionId("update-config");
pub const REINITIALIZE_ACCOUNTS: ActionId = ActionId("reinitialize-accounts");

const CONFIG: &str = "config";

pub fn settings_steps() -> StepRegistry {
    StepRegistry::new(vec![Step::new(STEP_SETTINGS, "Settings", 10, |_| true)])
}

/// Merges `update` into `base`, one level deep under each top-level key.
/// Deeper values are replaced wholesale.
fn merge_config(base: &Value, update: Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    let Value::Object(update) = update else {
        return Value::Object(merged);
    };
    for (section, value) in update {
        match (merged.get_mut(&section), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, value) => {
                merged.insert(section, value);
            }
        }
    }
    Value::Object(merged)
}

/// Background pull of the config document.
struct LoadConfig;

#[async_trait]
impl FlowAction for LoadConfig {
    fn id(&self) -> ActionId {
        LOAD_CONFIG
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let config = backend.get("config").await?;
        Ok(ActionOutcome::stay(FlowPatch::new().field(CONFIG, config)))
    }
}

/// Writes a partial config update: merges into the loaded document and posts
/// the whole merged result back.
pub struct UpdateConfig {
    pub update: Value,
}

#[async_trait]
impl FlowAction for UpdateConfig {
    fn id(&self) -> ActionId {
        UPDATE_CONFIG
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let base = state.field(CONFIG).cloned().unwrap_or(json!({}));
        let merged = merge_config(&base, self.update.clone());
        let response = backend.post("config", merged.clone()).await?;
        if !response.success {
            return Err(FlowError::request(
                response.error_message_or("Failed to save settings"),
            ));
        }
        Ok(ActionOutcome::stay(FlowPatch::new().field(CONFIG, merged)))
    }
}

/// Tears down and re-derives all accounts, e.g. after toggling a coin.
pub struct ReinitializeAccounts;

#[async_trait]
impl FlowAction for ReinitializeAccounts {
    fn id(&self) -> ActionId {
        REINITIALIZE_ACCOUNTS
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend.post("accounts/reinitialize", json!({})).await?;
        if !response.success {
            return Err(FlowError::request(
                response.error_message_or("Failed to reinitialize accounts"),
            ));
        }
        Ok(ActionOutcome::stay(FlowPatch::new()))
    }
}

struct SettingsEvents;

#[async_trait]
impl EventHandler for SettingsEvents {
    async fn on_start(&self, controller: &FlowController) -> anyhow::Result<()> {
        controller.run_background(&LoadConfig).await?;
        Ok(())
    }

    async fn handle(
        &self,
        event: &ExternalEvent,
        _controller: &FlowController,
    ) -> anyhow::Result<()> {
        debug!(payload = ?event.data(), "unhandled settings event");
        Ok(())
    }
}

/// Wires up the settings flow. It has no device and subscribes only to
/// broadcast-wide events.
pub fn settings_flow(
    backend: Arc<dyn BackendPort>,
    flow_events: Arc<dyn FlowEventPort>,
    ui: Arc<dyn UiPort>,
    notifications: Arc<dyn NotificationPort>,
) -> (Arc<FlowController>, StatusPoller) {
    let controller = Arc::new(FlowController::new(
        SubjectId::new("settings".into()),
        None,
        settings_steps(),
        backend,
        flow_events,
        ui,
    ));
    let poller = StatusPoller::new(controller.clone(), notifications, Arc::new(SettingsEvents));
    (controller, poller)
}
