//! UI coordination port.
//!
//! The flow never touches ambient UI state directly; panel visibility is an
//! explicit collaborator invoked at mount, teardown, and status changes.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiVisibility {
    /// Surrounding panel restored.
    Full,
    /// Surrounding panel hidden while the wizard runs.
    Hidden,
}

#[async_trait]
pub trait UiPort: Send + Sync {
    async fn set_visibility(&self, mode: UiVisibility) -> anyhow::Result<()>;
}
