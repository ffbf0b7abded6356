//! Shared test doubles for the flow integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use kb_app::FlowController;
use kb_core::flow::{FlowState, StepId};
use kb_core::ids::FlowId;
use kb_core::ports::{BackendPort, BackendResponse, FlowEventPort, TransportError, UiPort, UiVisibility};

/// Installs a tracing subscriber for the test binary, honoring `RUST_LOG`.
/// Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Programmable backend double. GET values persist per path; POST responses
/// are consumed from per-path queues, defaulting to a bare success.
#[derive(Default)]
pub struct MockBackend {
    gets: Mutex<HashMap<String, Value>>,
    posts: Mutex<HashMap<String, VecDeque<BackendResponse>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_get(&self, path: &str, value: Value) {
        self.gets.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn queue_post(&self, path: &str, response: BackendResponse) {
        self.posts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn post_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, p)| method == "POST" && p == path)
            .count()
    }

    pub fn get_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, p)| method == "GET" && p == path)
            .count()
    }
}

#[async_trait]
impl BackendPort for MockBackend {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(("GET".into(), path.to_string()));
        self.gets
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(format!("no stub for GET {}", path)))
    }

    async fn post(&self, path: &str, _body: Value) -> Result<BackendResponse, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(("POST".into(), path.to_string()));
        let response = self
            .posts
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(BackendResponse::ok);
        Ok(response)
    }
}

/// Records every published flow state snapshot.
#[derive(Default)]
pub struct RecordingFlowEvents {
    states: Mutex<Vec<FlowState>>,
}

impl RecordingFlowEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<FlowState> {
        self.states.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlowEventPort for RecordingFlowEvents {
    async fn emit_flow_state_changed(&self, _flow: FlowId, state: FlowState) {
        self.states.lock().unwrap().push(state);
    }
}

/// Records panel visibility changes.
#[derive(Default)]
pub struct RecordingUi {
    modes: Mutex<Vec<UiVisibility>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modes(&self) -> Vec<UiVisibility> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl UiPort for RecordingUi {
    async fn set_visibility(&self, mode: UiVisibility) -> anyhow::Result<()> {
        self.modes.lock().unwrap().push(mode);
        Ok(())
    }
}

/// Polls the flow state until the predicate holds, panicking after two
/// seconds. Event delivery runs on the poller task, so tests wait instead of
/// racing it.
pub async fn wait_for_state<F>(controller: &FlowController, description: &str, predicate: F)
where
    F: Fn(&FlowState) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if predicate(&controller.current().await) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Waits until the given step is the visible one.
pub async fn wait_for_step(controller: &FlowController, step: StepId) {
    let registry = controller.registry();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if registry.active(&controller.current().await) == Some(step) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for step '{}'", step);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
