use async_trait::async_trait;
use tracing::info;

use kb_core::ports::{UiPort, UiVisibility};

/// [`UiPort`] that only records visibility changes in the log. Used in
/// headless runs and tests; a windowed frontend supplies its own adapter.
#[derive(Debug, Default)]
pub struct LoggingUi;

#[async_trait]
impl UiPort for LoggingUi {
    async fn set_visibility(&self, mode: UiVisibility) -> anyhow::Result<()> {
        info!(?mode, "ui visibility changed");
        Ok(())
    }
}
