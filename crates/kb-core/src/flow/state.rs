//! Flow state record and patch semantics.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::device::DeviceStatus;
use crate::flow::phase::DispatchPhase;

/// Mutable view-state of one flow instance.
///
/// Created when the flow starts, mutated only by the action dispatcher and
/// the status poller, discarded at teardown. Owned exclusively by its flow;
/// no two flows share a state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowState {
    /// Last pulled external device status.
    pub status: DeviceStatus,
    /// Dispatcher phase, see [`DispatchPhase`].
    pub phase: DispatchPhase,
    /// Set while an external action is pending; a second dispatch of the
    /// same logical operation is rejected while held.
    pub locked: bool,
    /// Distinct indicator that the last confirmation wait was aborted on the
    /// device. Cleared on the next dispatch.
    pub aborted: bool,
    /// Generic interruptive notice for unrecognized request errors.
    pub notice: Option<String>,
    /// Field-scoped error messages, keyed by field name.
    pub errors: BTreeMap<String, String>,
    /// Per-step transient fields: form inputs, pulled values, wait-dialog
    /// copy. Flows define their own keys.
    pub fields: Map<String, Value>,
}

impl FlowState {
    pub fn with_status(status: DeviceStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// String field accessor.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Boolean field accessor.
    pub fn field_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Applies a patch with shallow-merge semantics and returns the merged
    /// state. Unspecified fields retain their prior value; an explicit JSON
    /// null in the field bag clears that key.
    pub fn merged(&self, patch: FlowPatch) -> FlowState {
        let mut next = self.clone();
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(phase) = patch.phase {
            next.phase = phase;
        }
        if let Some(locked) = patch.locked {
            next.locked = locked;
        }
        if let Some(aborted) = patch.aborted {
            next.aborted = aborted;
        }
        if let Some(notice) = patch.notice {
            next.notice = notice;
        }
        if patch.clear_errors {
            next.errors.clear();
        }
        for (field, message) in patch.errors {
            match message {
                Some(message) => {
                    next.errors.insert(field, message);
                }
                None => {
                    next.errors.remove(&field);
                }
            }
        }
        for (key, value) in patch.fields {
            if value.is_null() {
                next.fields.remove(&key);
            } else {
                next.fields.insert(key, value);
            }
        }
        next
    }
}

/// Partial update merged into [`FlowState`].
///
/// `None` on a typed field means "keep the prior value"; the nested option on
/// `notice` distinguishes clearing from keeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowPatch {
    pub status: Option<DeviceStatus>,
    pub phase: Option<DispatchPhase>,
    pub locked: Option<bool>,
    pub aborted: Option<bool>,
    pub notice: Option<Option<String>>,
    pub clear_errors: bool,
    pub errors: BTreeMap<String, Option<String>>,
    pub fields: Map<String, Value>,
}

impl FlowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn phase(mut self, phase: DispatchPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn aborted(mut self, aborted: bool) -> Self {
        self.aborted = Some(aborted);
        self
    }

    pub fn notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(Some(notice.into()));
        self
    }

    pub fn clear_notice(mut self) -> Self {
        self.notice = Some(None);
        self
    }

    pub fn clear_errors(mut self) -> Self {
        self.clear_errors = true;
        self
    }

    pub fn error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.insert(field.into(), Some(message.into()));
        self
    }

    pub fn clear_error(mut self, field: impl Into<String>) -> Self {
        self.errors.insert(field.into(), None);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn clear_field(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), Value::Null);
        self
    }

    /// Folds another patch into this one, later values winning.
    pub fn merge(mut self, other: FlowPatch) -> Self {
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.phase.is_some() {
            self.phase = other.phase;
        }
        if other.locked.is_some() {
            self.locked = other.locked;
        }
        if other.aborted.is_some() {
            self.aborted = other.aborted;
        }
        if other.notice.is_some() {
            self.notice = other.notice;
        }
        self.clear_errors |= other.clear_errors;
        self.errors.extend(other.errors);
        self.fields.extend(other.fields);
        self
    }
}
