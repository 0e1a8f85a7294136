use std::sync::Arc;

use anyhow::{bail, Result};

use super::brain::BrainStore;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Named system-prompt presets with a distinct lifecycle from the
/// conversation. Loading or saving a preset also makes it the active
/// prompt, which the coordinator re-reads on every submission.
pub struct SystemPromptManager {
    brain: Arc<dyn BrainStore>,
}

impl SystemPromptManager {
    pub fn new(brain: Arc<dyn BrainStore>) -> Self {
        Self { brain }
    }

    /// The active prompt, falling back to the default on any failure or
    /// blank content.
    pub async fn active(&self) -> String {
        match self.brain.system_prompt().await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
            Err(e) => {
                tracing::warn!("system prompt fetch failed, using fallback: {}", e);
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }

    /// Make `content` the active prompt. Best-effort, as with every
    /// keystroke-driven write.
    pub async fn apply(&self, content: &str) {
        if let Err(e) = self.brain.set_system_prompt(content).await {
            tracing::warn!("system prompt apply failed (best-effort): {}", e);
        }
    }

    pub async fn list(&self) -> Vec<String> {
        self.brain.list_presets().await.unwrap_or_default()
    }

    /// Load a preset's content and apply it as the active prompt. Falls
    /// back to the current active prompt when the preset is missing.
    pub async fn load(&self, name: &str) -> String {
        match self.brain.preset(name).await {
            Ok(content) if !content.trim().is_empty() => {
                self.apply(&content).await;
                content
            }
            _ => self.active().await,
        }
    }

    pub async fn save(&self, name: &str, content: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("preset name is required");
        }
        if content.trim().is_empty() {
            bail!("prompt cannot be empty");
        }
        self.brain.save_preset(name, content).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.brain.delete_preset(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::MemoryBrain;

    #[tokio::test]
    async fn test_active_falls_back_on_failure() {
        let brain = MemoryBrain::new();
        *brain.fail_prompt.lock().unwrap() = true;
        let prompts = SystemPromptManager::new(Arc::new(brain));
        assert_eq!(prompts.active().await, DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_save_applies_as_active() {
        let brain = Arc::new(MemoryBrain::new());
        let prompts = SystemPromptManager::new(brain.clone());

        prompts.save("narrator", "You narrate documentaries.").await.unwrap();
        assert_eq!(prompts.active().await, "You narrate documentaries.");
        assert_eq!(prompts.list().await, vec!["narrator".to_string()]);
    }

    #[tokio::test]
    async fn test_save_rejects_blank_input() {
        let prompts = SystemPromptManager::new(Arc::new(MemoryBrain::new()));
        assert!(prompts.save("  ", "content").await.is_err());
        assert!(prompts.save("name", "   ").await.is_err());
    }

    #[tokio::test]
    async fn test_load_applies_preset() {
        let brain = Arc::new(MemoryBrain::new());
        let prompts = SystemPromptManager::new(brain.clone());
        prompts.save("pirate", "Arr.").await.unwrap();
        prompts.apply("something else").await;

        assert_eq!(prompts.load("pirate").await, "Arr.");
        assert_eq!(prompts.active().await, "Arr.");
    }

    #[tokio::test]
    async fn test_load_missing_preset_keeps_active() {
        let brain = Arc::new(MemoryBrain::with_prompt("current"));
        let prompts = SystemPromptManager::new(brain);
        assert_eq!(prompts.load("ghost").await, "current");
    }

    #[tokio::test]
    async fn test_delete_preset() {
        let brain = Arc::new(MemoryBrain::new());
        let prompts = SystemPromptManager::new(brain);
        prompts.save("tmp", "x").await.unwrap();
        prompts.delete("tmp").await.unwrap();
        assert!(prompts.list().await.is_empty());
        assert!(prompts.delete("tmp").await.is_err());
    }
}
