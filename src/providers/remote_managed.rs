use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::stream::pump_text_stream;
use super::traits::ChatBackend;
use super::types::{status_err, transport_err, BackendError, InferBody, InferPayload, StreamEvent};
use crate::models::{BackendKind, BackendStatus, LoadSpec};

#[derive(Deserialize)]
struct StatusBody {
    loaded: bool,
    #[serde(default)]
    model: Option<String>,
}

/// An always-on external inference app (LM Studio style). Whatever model its
/// own UI has loaded is what we get; this client never loads or unloads.
pub struct RemoteManagedBackend {
    client: Client,
    base_url: String,
}

impl RemoteManagedBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/lmstudio/{}", self.base_url, path)
    }
}

#[async_trait]
impl ChatBackend for RemoteManagedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteManaged
    }

    /// Trust whatever the external app has loaded.
    async fn ensure_ready(&self, _spec: &LoadSpec) -> Result<(), BackendError> {
        Ok(())
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

    async fn poll_status(&self) -> BackendStatus {
        let response = match self.client.get(self.url("status")).send().await {
            Ok(r) => r,
            Err(_) => return BackendStatus::Offline,
        };

        match response.json::<StatusBody>().await {
            Ok(body) if body.loaded => match body.model {
                Some(model) if model != "—" => BackendStatus::Loaded { model },
                _ => BackendStatus::NotLoaded,
            },
            Ok(_) => BackendStatus::NotLoaded,
            Err(_) => BackendStatus::Offline,
        }
    }
}
