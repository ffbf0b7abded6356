//! HTTP client for the backend API.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use kb_core::ports::{BackendPort, BackendResponse, TransportError};

/// [`BackendPort`] over the backend's HTTP API.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BackendPort for HttpBackend {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(%url, "backend GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| TransportError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::InvalidResponse(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }

    async fn post(&self, path: &str, body: Value) -> Result<BackendResponse, TransportError> {
        let url = self.url(path);
        debug!(%url, "backend POST");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::InvalidResponse(format!(
                "POST {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json::<BackendResponse>()
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }
}
