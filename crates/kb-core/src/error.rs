//! Flow error taxonomy.
//!
//! Every error a flow can produce is absorbed at the dispatcher boundary and
//! turned into flow state fields; none of these are fatal.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to the user through flow state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum FlowError {
    /// A local precondition failed; no external call was made.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// The backend rejected the call with `success: false`.
    ///
    /// When the error is recognized it is scoped to a field, otherwise it is
    /// shown as a generic interruptive notice (`field: None`).
    #[error("{message}")]
    Request {
        message: String,
        field: Option<String>,
    },

    /// The call itself failed; the backend was unreachable or returned
    /// garbage. The flow unlocks without progress and the user may retry.
    #[error("{0}")]
    Transport(String),

    /// The device-confirmation wait ended in a failure event rather than
    /// success.
    #[error("aborted on device")]
    DeviceAbort,
}

impl FlowError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            field: None,
        }
    }

    pub fn request_for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Field this error is scoped to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::Request { field, .. } => field.as_deref(),
            Self::Transport(_) | Self::DeviceAbort => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_scoping() {
        assert_eq!(FlowError::validation("amount", "required").field(), Some("amount"));
        assert_eq!(
            FlowError::request_for_field("address", "invalid address").field(),
            Some("address")
        );
        assert_eq!(FlowError::request("boom").field(), None);
        assert_eq!(FlowError::Transport("timeout".into()).field(), None);
        assert_eq!(FlowError::DeviceAbort.field(), None);
    }
}
