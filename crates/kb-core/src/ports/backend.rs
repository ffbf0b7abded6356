//! Backend request/response port.
//!
//! The external backend owns device communication, transaction construction,
//! and signing. Flows reach it through this minimal contract: JSON GETs for
//! reads, JSON POSTs returning a `{ success, ... }` envelope for actions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::FlowError;

/// The call itself failed, before any backend answer could be interpreted.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for FlowError {
    fn from(err: TransportError) -> Self {
        FlowError::Transport(err.to_string())
    }
}

/// Envelope of a backend POST response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub success: bool,
    /// Error text on failure. The device backend spells this `errorMessage`,
    /// the wallet backend `errMsg`.
    #[serde(default, rename = "errorMessage", alias = "errMsg")]
    pub error_message: Option<String>,
    /// Remaining response fields, e.g. a proposed fee.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BackendResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn ok_with(fields: Map<String, Value>) -> Self {
        Self {
            success: true,
            error_message: None,
            fields,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Error message on failure, with a fallback for backends that reject
    /// without a message.
    pub fn error_message_or(&self, fallback: &str) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Request/response contract with the external backend.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// GET a JSON value (status, balance, config, conversions).
    async fn get(&self, path: &str) -> Result<Value, TransportError>;

    /// POST a JSON body, returning the `{ success, ... }` envelope.
    async fn post(&self, path: &str, body: Value) -> Result<BackendResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_parses_device_backend_spelling() {
        let response: BackendResponse =
            serde_json::from_value(json!({ "success": false, "errorMessage": "sd card full" }))
                .unwrap();
        assert!(!response.success);
        assert_eq!(response.error_message.as_deref(), Some("sd card full"));
    }

    #[test]
    fn test_envelope_parses_wallet_backend_spelling() {
        let response: BackendResponse =
            serde_json::from_value(json!({ "success": false, "errMsg": "invalid address" }))
                .unwrap();
        assert_eq!(response.error_message.as_deref(), Some("invalid address"));
    }

    #[test]
    fn test_extra_fields_are_collected() {
        let response: BackendResponse = serde_json::from_value(json!({
            "success": true,
            "fee": { "amount": "0.0001", "unit": "BTC" }
        }))
        .unwrap();
        assert!(response.success);
        assert_eq!(response.field("fee").unwrap()["unit"], "BTC");
    }

    #[test]
    fn test_transport_error_converts_to_flow_error() {
        let err: FlowError = TransportError::Unreachable("connection refused".into()).into();
        assert!(err.is_transport());
    }
}
