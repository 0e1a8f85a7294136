use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::stream::pump_text_stream;
use super::traits::ChatBackend;
use super::types::{status_err, transport_err, BackendError, InferBody, InferPayload, StreamEvent};
use crate::models::{BackendKind, BackendStatus, LoadSpec};

#[derive(Serialize)]
struct LoadBody<'a> {
    model_path: &'a str,
    n_ctx: u32,
    n_gpu_layers: i32,
}

#[derive(Deserialize)]
struct StatusBody {
    loaded: bool,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    loading: bool,
}

/// The on-device inference engine. The only backend this client actively
/// manages: load, unload and server-side cancel all go through here.
pub struct LocalBackend {
    client: Client,
    base_url: String,
}

impl LocalBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/chatbot/{}", self.base_url, path)
    }

    /// Model files the backend can see, full paths, sorted.
    pub async fn scan_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.url("scan_models"))
            .send()
            .await
            .map_err(transport_err)?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn load(&self, spec: &LoadSpec) -> Result<(), BackendError> {
        let model_path = spec.model_path.as_deref().ok_or(BackendError::NoModelSelected)?;

        let body = LoadBody {
            model_path,
            n_ctx: spec.context_size,
            n_gpu_layers: spec.wire_gpu_layers(),
        };

        let response = self
            .client
            .post(self.url("load"))
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_err(status, &text));
        }

        Ok(())
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    /// Check the engine's status and issue a load request if no model is
    /// resident. Returns as soon as the load request is accepted; it does
    /// not poll for load completion afterwards (the load endpoint itself
    /// only responds once the model is in memory).
    async fn ensure_ready(&self, spec: &LoadSpec) -> Result<(), BackendError> {
        let status = self.poll_status().await;
        if matches!(status, BackendStatus::Loaded { .. }) {
            return Ok(());
        }
        self.load(spec).await
    }

    async fn infer(
        &self,
        payload: InferPayload,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
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

    async fn cancel(&self) -> Result<(), BackendError> {
        self.client
            .post(self.url("cancel"))
            .send()
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn unload(&self) -> Result<(), BackendError> {
        self.client
            .post(self.url("unload"))
            .send()
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn poll_status(&self) -> BackendStatus {
        let response = match self.client.get(self.url("status")).send().await {
            Ok(r) => r,
            Err(_) => return BackendStatus::Offline,
        };

        match response.json::<StatusBody>().await {
            Ok(body) if body.loaded => BackendStatus::Loaded {
                model: body.path.unwrap_or_else(|| "—".to_string()),
            },
            Ok(body) if body.loading => BackendStatus::Loading,
            Ok(_) => BackendStatus::NotLoaded,
            Err(_) => BackendStatus::Offline,
        }
    }
}
