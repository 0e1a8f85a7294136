use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::stream::pump_text_stream;
use super::traits::ChatBackend;
use super::types::{
    status_err, transport_err, BackendError, InferBody, InferPayload, ModelInfo, StreamEvent,
    HOSTED_MODEL_AUTO,
};
use crate::models::{BackendKind, BackendStatus, LoadSpec};

#[derive(Deserialize)]
struct StatusBody {
    connected: bool,
}

/// Cloud-hosted multi-model API (OpenRouter style). No readiness work; the
/// request body names the model, defaulting to the provider's auto-router.
pub struct RemoteHostedBackend {
    client: Client,
    base_url: String,
}

impl RemoteHostedBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/openrouter/{}", self.base_url, path)
    }

    /// Full model catalog, for the model picker.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        let response = self
            .client
            .get(self.url("models"))
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_err(status, &text));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for RemoteHostedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteHosted
    }

    /// Authentication and model availability are the provider's problem.
    async fn ensure_ready(&self, _spec: &LoadSpec) -> Result<(), BackendError> {
        Ok(())
    }

    async fn infer(
        &self,
        mut payload: InferPayload,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
        if payload.model.is_none() {
            payload.model = Some(HOSTED_MODEL_AUTO.to_string());
        }

        let response = self
            .client
            .post(self.url("infer"))
            .json(&InferBody::from_payload(&payload))
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_err(status, &text));
        }

        pump_text_stream(response, tx).await;
        Ok(())
    }

    async fn poll_status(&self) -> BackendStatus {
        let response = match self.client.get(self.url("status")).send().await {
            Ok(r) => r,
            Err(_) => return BackendStatus::Offline,
        };

        match response.json::<StatusBody>().await {
            Ok(body) if body.connected => BackendStatus::Connected,
            Ok(_) => BackendStatus::Unauthorized,
            Err(_) => BackendStatus::Offline,
        }
    }
}
