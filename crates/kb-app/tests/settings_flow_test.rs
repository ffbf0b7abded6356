//! Scenarios for the settings flow.

mod common;

use std::sync::Arc;

use serde_json::json;

use kb_app::flows::settings::{settings_flow, ReinitializeAccounts, UpdateConfig};
use kb_core::ports::BackendResponse;
use kb_infra::NotificationHub;

use common::{init_tracing, MockBackend, RecordingFlowEvents, RecordingUi};

#[tokio::test]
async fn test_config_loads_on_start() {
    init_tracing();
    let backend = Arc::new(MockBackend::new());
    backend.set_get("config", json!({ "frontend": { "language": "en" } }));

    let (controller, poller) = settings_flow(
        backend.clone(),
        Arc::new(RecordingFlowEvents::new()),
        Arc::new(RecordingUi::new()),
        Arc::new(NotificationHub::new(4)),
    );
    let _handle = poller.start().await;

    let state = controller.current().await;
    assert_eq!(state.field("config").unwrap()["frontend"]["language"], "en");
}

#[tokio::test]
async fn test_update_merges_and_persists() {
    init_tracing();
    let backend = Arc::new(MockBackend::new());
    backend.set_get(
        "config",
        json!({
            "backend": { "bitcoinP2PKHActive": true },
            "frontend": { "language": "en" }
        }),
    );

    let (controller, poller) = settings_flow(
        backend.clone(),
        Arc::new(RecordingFlowEvents::new()),
        Arc::new(RecordingUi::new()),
        Arc::new(NotificationHub::new(4)),
    );
    let _handle = poller.start().await;

    let state = controller
        .dispatch(&UpdateConfig {
            update: json!({ "frontend": { "language": "de" } }),
        })
        .await
        .unwrap();

    assert_eq!(backend.post_count("config"), 1);
    let config = state.field("config").unwrap();
    assert_eq!(config["frontend"]["language"], "de");
    assert_eq!(config["backend"]["bitcoinP2PKHActive"], true);
}

#[tokio::test]
async fn test_failed_update_keeps_the_loaded_config() {
    init_tracing();
    let backend = Arc::new(MockBackend::new());
    backend.set_get("config", json!({ "frontend": { "language": "en" } }));
    backend.queue_post("config", BackendResponse::failure("disk full"));

    let (controller, poller) = settings_flow(
        backend.clone(),
        Arc::new(RecordingFlowEvents::new()),
        Arc::new(RecordingUi::new()),
        Arc::new(NotificationHub::new(4)),
    );
    let _handle = poller.start().await;

    let state = controller
        .dispatch(&UpdateConfig {
            update: json!({ "frontend": { "language": "de" } }),
        })
        .await
        .unwrap();

    assert_eq!(state.notice.as_deref(), Some("disk full"));
    assert_eq!(state.field("config").unwrap()["frontend"]["language"], "en");
}

#[tokio::test]
async fn test_reinitialize_accounts_posts_once() {
    init_tracing();
    let backend = Arc::new(MockBackend::new());
    backend.set_get("config", json!({}));

    let (controller, poller) = settings_flow(
        backend.clone(),
        Arc::new(RecordingFlowEvents::new()),
        Arc::new(RecordingUi::new()),
        Arc::new(NotificationHub::new(4)),
    );
    let _handle = poller.start().await;

    controller.dispatch(&ReinitializeAccounts).await.unwrap();
    assert_eq!(backend.post_count("accounts/reinitialize"), 1);
}
