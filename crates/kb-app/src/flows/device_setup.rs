//! Device setup wizard.
//!
//! Drives a hardware device from first attach to an initialized wallet:
//! unlock, pairing confirmation, then either creating a new wallet (name,
//! password, backup) or restoring one (from SD card backup or mnemonic).
//! Progress is not stored locally; the pulled device status is the source of
//! truth, so a flow restarted mid-setup resumes at the right step.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use kb_core::device::DeviceStatus;
use kb_core::error::FlowError;
use kb_core::event::{ExternalEvent, CHANNEL_HASH_CHANGED, STATUS_CHANGED};
use kb_core::flow::{ActionId, DispatchPhase, FlowPatch, FlowState, Step, StepId, StepRegistry};
use kb_core::ids::SubjectId;
use kb_core::ports::{BackendPort, FlowEventPort, NotificationPort, UiPort};

use crate::flow::{
    ActionOutcome, EventHandler, FlowAction, FlowController, StatusPoller,
};
use crate::flows::device_error;

pub const STEP_UNLOCK: StepId = StepId("unlock");
pub const STEP_PAIRING: StepId = StepId("pairing");
pub const STEP_CHOOSE_SETUP: StepId = StepId("choose-setup");
pub const STEP_WALLET_NAME: StepId = StepId("wallet-name");
pub const STEP_SET_PASSWORD: StepId = StepId("set-password");
pub const STEP_CREATE_BACKUP: StepId = StepId("create-backup");
pub const STEP_RESTORE_BACKUP: StepId = StepId("restore-backup");
pub const STEP_RESTORE_PASSWORD: StepId = StepId("restore-password");
pub const STEP_RESTORE_MNEMONIC: StepId = StepId("restore-mnemonic");
pub const STEP_SUCCESS_CREATE: StepId = StepId("success-create");
pub const STEP_SUCCESS_RESTORE: StepId = StepId("success-restore");
pub const STEP_SUCCESS_MNEMONIC: StepId = StepId("success-mnemonic");

pub const CONFIRM_PAIRING: ActionId = ActionId("confirm-pairing");
pub const CHOOSE_CREATE_WALLET: ActionId = ActionId("choose-create-wallet");
pub const CHOOSE_RESTORE_BACKUP: ActionId = ActionId("choose-restore-backup");
pub const CHOOSE_RESTORE_MNEMONIC: ActionId = ActionId("choose-restore-mnemonic");
pub const INSERT_SD_CARD: ActionId = ActionId("insert-sd-card");
pub const SET_DEVICE_NAME: ActionId = ActionId("set-device-name");
pub const SET_PASSWORD: ActionId = ActionId("set-password");
pub const CREATE_BACKUP: ActionId = ActionId("create-backup");
pub const RESTORE_BACKUP: ActionId = ActionId("restore-backup");
pub const RESTORE_FROM_MNEMONIC: ActionId = ActionId("restore-from-mnemonic");
pub const REFRESH_CHANNEL_HASH: ActionId = ActionId("refresh-channel-hash");
pub const CHECK_SD_CARD: ActionId = ActionId("check-sd-card");

// Field keys of this flow's state bag.
const SETUP_MODE: &str = "setupMode";
const CREATE_STEP: &str = "createStep";
const RESTORE_STEP: &str = "restoreStep";
const DEVICE_NAME: &str = "deviceName";
const SD_CARD_INSERTED: &str = "sdCardInserted";
const CHANNEL_HASH: &str = "channelHash";
const DEVICE_VERIFIED: &str = "deviceVerified";
const UNLOCK_ONLY: &str = "unlockOnly";
const READ_DISCLAIMERS: &str = "readDisclaimers";
const WAIT_TITLE: &str = "waitTitle";
const WAIT_TEXT: &str = "waitText";

const MODE_CREATE: &str = "create";
const MODE_RESTORE: &str = "restore";
const MODE_MNEMONIC: &str = "mnemonic";

const DEVICE_NAME_MAX: usize = 63;

fn mode(state: &FlowState) -> Option<&str> {
    state.field_str(SETUP_MODE)
}

/// Whether this session only unlocked an already set-up device. Defaults to
/// true; flipped once the pulled status proves a fresh device, so success
/// screens show only when a setup actually happened here.
fn unlock_only(state: &FlowState) -> bool {
    state.field_bool(UNLOCK_ONLY).unwrap_or(true)
}

fn in_setup(state: &FlowState) -> bool {
    matches!(
        state.status,
        DeviceStatus::Uninitialized | DeviceStatus::Seeded
    )
}

pub fn device_setup_steps() -> StepRegistry {
    StepRegistry::new(vec![
        Step::new(STEP_UNLOCK, "Unlock your device", 10, |s| {
            s.status == DeviceStatus::Connected
        }),
        Step::new(STEP_PAIRING, "Verify the pairing code", 20, |s| {
            matches!(
                s.status,
                DeviceStatus::Unpaired | DeviceStatus::PairingFailed
            )
        }),
        Step::new(STEP_CHOOSE_SETUP, "Set up your device", 30, |s| {
            s.status == DeviceStatus::Uninitialized && mode(s).is_none() && !unlock_only(s)
        }),
        Step::new(STEP_WALLET_NAME, "Name your device", 40, |s| {
            s.status == DeviceStatus::Uninitialized
                && mode(s) == Some(MODE_CREATE)
                && s.field_str(CREATE_STEP) == Some("name")
        }),
        Step::new(STEP_SET_PASSWORD, "Set a password", 50, |s| {
            in_setup(s)
                && mode(s) == Some(MODE_CREATE)
                && s.field_str(CREATE_STEP) == Some("password")
        }),
        Step::new(STEP_CREATE_BACKUP, "Create a backup", 60, |s| {
            s.status == DeviceStatus::Seeded
                && mode(s) == Some(MODE_CREATE)
                && s.field_str(CREATE_STEP) == Some("backup")
        }),
        Step::new(STEP_RESTORE_BACKUP, "Restore from backup", 70, |s| {
            in_setup(s)
                && mode(s) == Some(MODE_RESTORE)
                && s.field_str(RESTORE_STEP) == Some("restore")
        }),
        Step::new(STEP_RESTORE_PASSWORD, "Set a password", 80, |s| {
            in_setup(s)
                && mode(s) == Some(MODE_RESTORE)
                && s.field_str(RESTORE_STEP) == Some("password")
        }),
        Step::new(STEP_RESTORE_MNEMONIC, "Restore from mnemonic", 85, |s| {
            in_setup(s) && mode(s) == Some(MODE_MNEMONIC)
        }),
        Step::new(STEP_SUCCESS_CREATE, "Wallet created", 90, |s| {
            s.status == DeviceStatus::Initialized && mode(s) == Some(MODE_CREATE)
        }),
        Step::new(STEP_SUCCESS_RESTORE, "Wallet restored", 91, |s| {
            s.status == DeviceStatus::Initialized && mode(s) == Some(MODE_RESTORE)
        }),
        Step::new(STEP_SUCCESS_MNEMONIC, "Wallet restored", 92, |s| {
            s.status == DeviceStatus::Initialized && mode(s) == Some(MODE_MNEMONIC)
        }),
    ])
}

/// Top-level screen for a device, resolved from flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceScreen {
    /// Status unknown; render nothing yet.
    None,
    UpgradeRequired,
    /// Device fully set up and nothing left to show; the device settings
    /// panel takes over.
    Settings,
    Wizard(StepId),
}

pub fn screen(state: &FlowState, registry: &StepRegistry) -> DeviceScreen {
    if state.status.needs_upgrade() {
        return DeviceScreen::UpgradeRequired;
    }
    match registry.active(state) {
        Some(step) => DeviceScreen::Wizard(step),
        None if state.status.is_initialized() => DeviceScreen::Settings,
        None => DeviceScreen::None,
    }
}

/// Device API paths, rooted per subject.
#[derive(Clone)]
pub struct DeviceApi {
    prefix: String,
}

impl DeviceApi {
    pub fn new(subject: &SubjectId) -> Self {
        Self {
            prefix: format!("devices/hww/{}", subject),
        }
    }

    fn path(&self, tail: &str) -> String {
        format!("{}/{}", self.prefix, tail)
    }
}

fn wait_patch(title: &str, text: &str) -> FlowPatch {
    FlowPatch::new().field(WAIT_TITLE, title).field(WAIT_TEXT, text)
}

fn clear_wait() -> FlowPatch {
    FlowPatch::new().clear_field(WAIT_TITLE).clear_field(WAIT_TEXT)
}

/// Ensures an SD card is present before a backup operation: a no-op when the
/// last check already found one, otherwise a blocking call that returns once
/// the user inserted a card.
async fn ensure_sd_card(
    api: &DeviceApi,
    backend: &dyn BackendPort,
    state: &FlowState,
) -> Result<(), FlowError> {
    if state.field_bool(SD_CARD_INSERTED) == Some(true) {
        return Ok(());
    }
    let response = backend.post(&api.path("insert-sdcard"), json!({})).await?;
    if !response.success {
        return Err(FlowError::request(
            response.error_message_or("Failed to check the SD card"),
        ));
    }
    Ok(())
}

/// Starts the wait for the user to verify the pairing code on the device.
/// The wait resolves through a later status event, never a timeout.
pub struct ConfirmPairing {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for ConfirmPairing {
    fn id(&self) -> ActionId {
        CONFIRM_PAIRING
    }

    fn validate(&self, state: &FlowState) -> Result<(), FlowError> {
        if state.field_bool(DEVICE_VERIFIED) != Some(true) {
            return Err(FlowError::validation(
                DEVICE_VERIFIED,
                "The device has not shown the pairing code yet",
            ));
        }
        Ok(())
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(&self.api.path("channel-hash-verify"), json!(true))
            .await?;
        if !response.success {
            return Err(FlowError::request(
                response.error_message_or("Pairing verification failed"),
            ));
        }
        Ok(ActionOutcome::AwaitConfirmation {
            patch: wait_patch(
                "Confirm pairing",
                "Confirm the code on your device to finish pairing",
            ),
        })
    }
}

pub struct ChooseCreateWallet {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for ChooseCreateWallet {
    fn id(&self) -> ActionId {
        CHOOSE_CREATE_WALLET
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let inserted = backend
            .get(&self.api.path("check-sdcard"))
            .await?
            .as_bool()
            .unwrap_or(false);
        Ok(ActionOutcome::advance(
            STEP_WALLET_NAME,
            FlowPatch::new()
                .field(SETUP_MODE, MODE_CREATE)
                .field(CREATE_STEP, "name")
                .field(SD_CARD_INSERTED, inserted),
        ))
    }
}

pub struct ChooseRestoreBackup {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for ChooseRestoreBackup {
    fn id(&self) -> ActionId {
        CHOOSE_RESTORE_BACKUP
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("SD card", "Insert the SD card holding your backup")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        ensure_sd_card(&self.api, backend, state).await?;
        Ok(ActionOutcome::advance(
            STEP_RESTORE_BACKUP,
            FlowPatch::new()
                .field(SETUP_MODE, MODE_RESTORE)
                .field(RESTORE_STEP, "restore")
                .field(SD_CARD_INSERTED, true),
        ))
    }
}

/// Picking mnemonic restore needs no backend call; the state change alone
/// moves the wizard.
pub struct ChooseRestoreFromMnemonic;

#[async_trait]
impl FlowAction for ChooseRestoreFromMnemonic {
    fn id(&self) -> ActionId {
        CHOOSE_RESTORE_MNEMONIC
    }

    async fn call(
        &self,
        _backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        Ok(ActionOutcome::advance(
            STEP_RESTORE_MNEMONIC,
            FlowPatch::new().field(SETUP_MODE, MODE_MNEMONIC),
        ))
    }
}

pub struct InsertSdCard {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for InsertSdCard {
    fn id(&self) -> ActionId {
        INSERT_SD_CARD
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("SD card", "Insert an SD card into your device")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        ensure_sd_card(&self.api, backend, state).await?;
        Ok(ActionOutcome::stay(
            FlowPatch::new().field(SD_CARD_INSERTED, true),
        ))
    }
}

pub struct SetDeviceName {
    api: DeviceApi,
    name: String,
}

impl SetDeviceName {
    pub fn new(api: DeviceApi, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

#[async_trait]
impl FlowAction for SetDeviceName {
    fn id(&self) -> ActionId {
        SET_DEVICE_NAME
    }

    fn validate(&self, _state: &FlowState) -> Result<(), FlowError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(FlowError::validation(DEVICE_NAME, "Please enter a name"));
        }
        if trimmed.len() > DEVICE_NAME_MAX {
            return Err(FlowError::validation(DEVICE_NAME, "That name is too long"));
        }
        Ok(())
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("Confirm name", "Confirm the name on your device")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let name = self.name.trim();
        let response = backend
            .post(&self.api.path("set-device-name"), json!({ "name": name }))
            .await?;
        if !response.success {
            return Err(FlowError::request_for_field(
                DEVICE_NAME,
                response.error_message_or("Failed to set the name"),
            ));
        }
        Ok(ActionOutcome::advance(
            STEP_SET_PASSWORD,
            FlowPatch::new()
                .field(DEVICE_NAME, name)
                .field(CREATE_STEP, "password"),
        ))
    }
}

/// Password entry happens entirely on the device; the call blocks until both
/// entries are done. A mismatch is a plain failure the user retries by
/// dispatching again, there is no automatic re-prompt.
pub struct SetPassword {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for SetPassword {
    fn id(&self) -> ActionId {
        SET_PASSWORD
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("Set a password", "Follow the instructions on your device")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(&self.api.path("set-password"), json!({}))
            .await?;
        if !response.success {
            return Err(FlowError::request_for_field(
                "password",
                response.error_message_or("Passwords did not match, please try again."),
            ));
        }
        // The device is now seeded; the status event moves the wizard on.
        Ok(ActionOutcome::stay(
            FlowPatch::new().field(CREATE_STEP, "backup"),
        ))
    }
}

pub struct CreateBackup {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for CreateBackup {
    fn id(&self) -> ActionId {
        CREATE_BACKUP
    }

    fn validate(&self, state: &FlowState) -> Result<(), FlowError> {
        if state.field_bool(SD_CARD_INSERTED) != Some(true) {
            return Err(FlowError::validation(
                SD_CARD_INSERTED,
                "Insert an SD card into your device first",
            ));
        }
        if state.field_bool(READ_DISCLAIMERS) != Some(true) {
            return Err(FlowError::validation(
                READ_DISCLAIMERS,
                "Please read and acknowledge the backup notes",
            ));
        }
        Ok(())
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("Create backup", "Confirm today's date on your device")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(&self.api.path("backups/create"), json!({}))
            .await?;
        if !response.success {
            return Err(device_error(
                response.error_message_or("Backup creation failed"),
            ));
        }
        // Finishing the backup initializes the device; the status event
        // carries the wizard to the success screen.
        Ok(ActionOutcome::stay(FlowPatch::new()))
    }
}

pub struct RestoreBackup {
    api: DeviceApi,
    backup_id: String,
}

impl RestoreBackup {
    pub fn new(api: DeviceApi, backup_id: impl Into<String>) -> Self {
        Self {
            api,
            backup_id: backup_id.into(),
        }
    }
}

#[async_trait]
impl FlowAction for RestoreBackup {
    fn id(&self) -> ActionId {
        RESTORE_BACKUP
    }

    fn validate(&self, _state: &FlowState) -> Result<(), FlowError> {
        if self.backup_id.is_empty() {
            return Err(FlowError::validation("backup", "Select a backup to restore"));
        }
        Ok(())
    }

    /// The device asks for a new password during restore; show the password
    /// step while the call is outstanding.
    fn pending_patch(&self) -> FlowPatch {
        FlowPatch::new().field(RESTORE_STEP, "password")
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(
                &self.api.path("backups/restore"),
                json!({ "id": self.backup_id }),
            )
            .await?;
        if !response.success {
            return Err(device_error(response.error_message_or("Restore failed")));
        }
        Ok(ActionOutcome::stay(FlowPatch::new()))
    }
}

pub struct RestoreFromMnemonic {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for RestoreFromMnemonic {
    fn id(&self) -> ActionId {
        RESTORE_FROM_MNEMONIC
    }

    fn pending_patch(&self) -> FlowPatch {
        wait_patch("Restore from mnemonic", "Enter your mnemonic on the device")
    }

    fn cleanup_patch(&self) -> FlowPatch {
        clear_wait()
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let response = backend
            .post(&self.api.path("restore-from-mnemonic"), json!({}))
            .await?;
        if !response.success {
            return Err(device_error(
                response.error_message_or("Mnemonic restore failed"),
            ));
        }
        Ok(ActionOutcome::stay(FlowPatch::new()))
    }
}

/// Background pull of the pairing hash and its on-device visibility.
struct RefreshChannelHash {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for RefreshChannelHash {
    fn id(&self) -> ActionId {
        REFRESH_CHANNEL_HASH
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let value = backend.get(&self.api.path("channel-hash")).await?;
        let hash = value
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| FlowError::Transport("channel hash missing in response".into()))?
            .to_string();
        let verified = value
            .get("deviceVerified")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(ActionOutcome::stay(
            FlowPatch::new()
                .field(CHANNEL_HASH, hash)
                .field(DEVICE_VERIFIED, verified),
        ))
    }
}

/// Background pull of SD card presence.
struct CheckSdCard {
    api: DeviceApi,
}

#[async_trait]
impl FlowAction for CheckSdCard {
    fn id(&self) -> ActionId {
        CHECK_SD_CARD
    }

    async fn call(
        &self,
        backend: &dyn BackendPort,
        _state: &FlowState,
    ) -> Result<ActionOutcome, FlowError> {
        let inserted = backend
            .get(&self.api.path("check-sdcard"))
            .await?
            .as_bool()
            .unwrap_or(false);
        Ok(ActionOutcome::stay(
            FlowPatch::new().field(SD_CARD_INSERTED, inserted),
        ))
    }
}

/// Reacts to device lifecycle events: re-pulls the status, keeps the session
/// bookkeeping current, and resolves a pending pairing confirmation.
pub struct DeviceSetupEvents {
    api: DeviceApi,
}

impl DeviceSetupEvents {
    fn bookkeeping(&self, state: &FlowState) -> FlowPatch {
        let mut patch = FlowPatch::new();
        if state.status.proves_fresh_device() && unlock_only(state) {
            patch = patch.field(UNLOCK_ONLY, false);
        }
        // A device seeded outside this session (e.g. the flow restarted after
        // the password step) resumes at the backup step.
        if state.status == DeviceStatus::Seeded && mode(state).is_none() {
            patch = patch
                .field(SETUP_MODE, MODE_CREATE)
                .field(CREATE_STEP, "backup");
        }
        patch
    }
}

#[async_trait]
impl EventHandler for DeviceSetupEvents {
    async fn on_start(&self, controller: &FlowController) -> anyhow::Result<()> {
        controller
            .run_background(&RefreshChannelHash {
                api: self.api.clone(),
            })
            .await?;
        controller
            .run_background(&CheckSdCard {
                api: self.api.clone(),
            })
            .await?;
        let state = controller.current().await;
        controller.apply_patch(self.bookkeeping(&state)).await?;
        Ok(())
    }

    async fn handle(
        &self,
        event: &ExternalEvent,
        controller: &FlowController,
    ) -> anyhow::Result<()> {
        match event.data() {
            Some(STATUS_CHANGED) => {
                let state = controller.refresh_status().await?;
                controller.apply_patch(self.bookkeeping(&state)).await?;

                if let DispatchPhase::AwaitingConfirmation { action } = state.phase {
                    if action == CONFIRM_PAIRING {
                        match state.status {
                            DeviceStatus::PairingFailed => {
                                controller
                                    .resolve_confirmation(false, None, clear_wait())
                                    .await?;
                            }
                            DeviceStatus::Uninitialized
                            | DeviceStatus::Seeded
                            | DeviceStatus::Initialized => {
                                controller
                                    .resolve_confirmation(true, None, clear_wait())
                                    .await?;
                            }
                            _ => {}
                        }
                    }
                }
                Ok(())
            }
            Some(CHANNEL_HASH_CHANGED) => {
                controller
                    .run_background(&RefreshChannelHash {
                        api: self.api.clone(),
                    })
                    .await?;
                Ok(())
            }
            other => {
                debug!(payload = ?other, "unhandled device event");
                Ok(())
            }
        }
    }
}

/// Bundle of the dispatchable actions of one device setup flow.
pub struct DeviceSetupActions {
    api: DeviceApi,
}

impl DeviceSetupActions {
    pub fn new(api: DeviceApi) -> Self {
        Self { api }
    }

    pub fn confirm_pairing(&self) -> ConfirmPairing {
        ConfirmPairing {
            api: self.api.clone(),
        }
    }

    pub fn choose_create_wallet(&self) -> ChooseCreateWallet {
        ChooseCreateWallet {
            api: self.api.clone(),
        }
    }

    pub fn choose_restore_backup(&self) -> ChooseRestoreBackup {
        ChooseRestoreBackup {
            api: self.api.clone(),
        }
    }

    pub fn choose_restore_from_mnemonic(&self) -> ChooseRestoreFromMnemonic {
        ChooseRestoreFromMnemonic
    }

    pub fn insert_sd_card(&self) -> InsertSdCard {
        InsertSdCard {
            api: self.api.clone(),
        }
    }

    pub fn set_device_name(&self, name: impl Into<String>) -> SetDeviceName {
        SetDeviceName::new(self.api.clone(), name)
    }

    pub fn set_password(&self) -> SetPassword {
        SetPassword {
            api: self.api.clone(),
        }
    }

    pub fn create_backup(&self) -> CreateBackup {
        CreateBackup {
            api: self.api.clone(),
        }
    }

    pub fn restore_backup(&self, backup_id: impl Into<String>) -> RestoreBackup {
        RestoreBackup::new(self.api.clone(), backup_id)
    }

    pub fn restore_from_mnemonic(&self) -> RestoreFromMnemonic {
        RestoreFromMnemonic {
            api: self.api.clone(),
        }
    }
}

/// Wires up a device setup flow for one device.
pub fn device_setup_flow(
    subject: SubjectId,
    backend: Arc<dyn BackendPort>,
    flow_events: Arc<dyn FlowEventPort>,
    ui: Arc<dyn UiPort>,
    notifications: Arc<dyn NotificationPort>,
) -> (Arc<FlowController>, DeviceSetupActions, StatusPoller) {
    let api = DeviceApi::new(&subject);
    let controller = Arc::new(FlowController::new(
        subject,
        Some(api.path("status")),
        device_setup_steps(),
        backend,
        flow_events,
        ui,
    ));
    let poller = StatusPoller::new(
        controller.clone(),
        notifications,
        Arc::new(DeviceSetupEvents { api: api.clone() }),
    );
    (controller, DeviceSetupActions::new(api), poller)
}
