use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::Message;

/// Narrow persistence surface behind the chat session: the active system
/// prompt, named prompt presets, the current history, and archived
/// conversations. The production implementation talks to the studio
/// backend's "brain" endpoints; tests substitute an in-memory fake.
#[async_trait]
pub trait BrainStore: Send + Sync {
    /// Current active system prompt text.
    async fn system_prompt(&self) -> Result<String>;

    async fn set_system_prompt(&self, content: &str) -> Result<()>;

    /// Content of a named preset.
    async fn preset(&self, name: &str) -> Result<String>;

    /// Persist a named preset. Also makes `content` the active prompt
    /// (the backend writes both in one operation).
    async fn save_preset(&self, name: &str, content: &str) -> Result<()>;

    async fn delete_preset(&self, name: &str) -> Result<()>;

    /// Preset names, most recently modified first.
    async fn list_presets(&self) -> Result<Vec<String>>;

    async fn history(&self) -> Result<Vec<Message>>;

    async fn replace_history(&self, history: &[Message]) -> Result<()>;

    /// Archive names, opaque handles valid for `load_archive`.
    async fn list_archives(&self) -> Result<Vec<String>>;

    async fn save_archive(&self, name: &str, history: &[Message]) -> Result<()>;

    async fn load_archive(&self, name: &str) -> Result<Vec<Message>>;
}

#[derive(Deserialize)]
struct PromptBody {
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct SavePromptBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    content: &'a str,
}

#[derive(Deserialize)]
struct ArchiveBody {
    history: Vec<Message>,
}

/// HTTP client for the studio backend's brain endpoints.
pub struct HttpBrain {
    client: Client,
    base_url: String,
}

impl HttpBrain {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/chatbot/brain/{}", self.base_url, path)
    }

    fn preset_file(name: &str) -> String {
        if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}.json", name)
        }
    }
}

#[async_trait]
impl BrainStore for HttpBrain {
    async fn system_prompt(&self) -> Result<String> {
        let body: PromptBody = self
            .client
            .get(self.url("system_prompt"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.content)
    }

    async fn set_system_prompt(&self, content: &str) -> Result<()> {
        self.client
            .post(self.url("system_prompt"))
            .json(&SavePromptBody {
                filename: None,
                content,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn preset(&self, name: &str) -> Result<String> {
        let body: PromptBody = self
            .client
            .get(self.url("system_prompt"))
            .query(&[("file", Self::preset_file(name))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.content)
    }

    async fn save_preset(&self, name: &str, content: &str) -> Result<()> {
        self.client
            .post(self.url("system_prompt"))
            .json(&SavePromptBody {
                filename: Some(Self::preset_file(name)),
                content,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_preset(&self, name: &str) -> Result<()> {
        self.client
            .delete(self.url("system_prompt"))
            .query(&[("delete", Self::preset_file(name))])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_presets(&self) -> Result<Vec<String>> {
        let files: Vec<String> = self
            .client
            .get(self.url("list_system_prompts"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(files
            .into_iter()
            .map(|f| f.trim_end_matches(".json").to_string())
            .collect())
    }

    async fn history(&self) -> Result<Vec<Message>> {
        let history = self
            .client
            .get(self.url("history"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(history)
    }

    async fn replace_history(&self, history: &[Message]) -> Result<()> {
        self.client
            .post(self.url("history"))
            .json(&history)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_archives(&self) -> Result<Vec<String>> {
        let files = self
            .client
            .get(self.url("list_archives"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(files)
    }

    async fn save_archive(&self, name: &str, history: &[Message]) -> Result<()> {
        self.client
            .post(self.url("save_archive"))
            .json(&json!({ "filename": name, "history": history }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn load_archive(&self, name: &str) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(self.url("load_archive"))
            .query(&[("file", name)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("archive {} not found", name));
        }

        let body: ArchiveBody = response.json().await?;
        Ok(body.history)
    }
}
