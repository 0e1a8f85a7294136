use std::sync::Arc;

use anyhow::{Context, Result};

use super::brain::BrainStore;
use super::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::models::{Message, Role};

/// In-memory conversation plus its persistence mediation. The system
/// message is held apart from the history: it is never rendered, never
/// persisted with the history, and re-attached synthetically when a request
/// payload is built.
///
/// Writes to the brain are best-effort: a failed persist is logged and the
/// session carries on. Reads that fail fall back to an empty or default
/// value. The only operation that reports failure to the caller is
/// `load_from_archive`, where the user asked for specific content.
pub struct ConversationStore {
    brain: Arc<dyn BrainStore>,
    system: Message,
    history: Vec<Message>,
    pending_assistant: bool,
}

impl ConversationStore {
    /// Fetch the system prompt and persisted history. Never fails: any
    /// brain error degrades to the default prompt and an empty history.
    pub async fn load(brain: Arc<dyn BrainStore>) -> Self {
        let system = match brain.system_prompt().await {
            Ok(content) if !content.trim().is_empty() => Message::system(content),
            Ok(_) => Message::system(DEFAULT_SYSTEM_PROMPT),
            Err(e) => {
                tracing::warn!("system prompt load failed, using default: {}", e);
                Message::system(DEFAULT_SYSTEM_PROMPT)
            }
        };

        let history = match brain.history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("history load failed, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            brain,
            system,
            history,
            pending_assistant: false,
        }
    }

    pub fn system(&self) -> &Message {
        &self.system
    }

    /// The rendered transcript: everything but the system message.
    pub fn transcript(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.history.push(Message::user(text));
    }

    /// Append the empty assistant message that will receive streamed tokens.
    pub fn begin_assistant(&mut self) {
        debug_assert!(!self.pending_assistant);
        self.history.push(Message::assistant(""));
        self.pending_assistant = true;
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        debug_assert!(self.pending_assistant);
        if let Some(last) = self.history.last_mut() {
            last.content.push_str(chunk);
        }
    }

    /// Content of the in-progress assistant message.
    pub fn pending_content(&self) -> &str {
        if self.pending_assistant {
            self.history.last().map(|m| m.content.as_str()).unwrap_or("")
        } else {
            ""
        }
    }

    /// The stream finished; the trailing assistant message is now a normal
    /// part of the history.
    pub fn complete_pending(&mut self) {
        self.pending_assistant = false;
    }

    /// Drop the in-progress assistant message, partial content and all.
    pub fn discard_pending(&mut self) {
        if self.pending_assistant {
            self.history.pop();
            self.pending_assistant = false;
        }
    }

    /// Undo a failed submission entirely: the placeholder and the user
    /// message that triggered it both come back out.
    pub fn rollback_submission(&mut self) {
        self.discard_pending();
        if self.history.last().map(|m| m.role) == Some(Role::User) {
            self.history.pop();
        }
    }

    /// Outbound request messages: the freshly resolved system prompt first,
    /// then the history minus the trailing in-progress placeholder.
    pub fn payload_messages(&self, system_prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(system_prompt));
        let end = if self.pending_assistant {
            self.history.len() - 1
        } else {
            self.history.len()
        };
        messages.extend_from_slice(&self.history[..end]);
        messages
    }

    /// Write the history (system message excluded) to the brain.
    /// Best-effort: failure is logged, never surfaced.
    pub async fn persist(&self) {
        if let Err(e) = self.brain.replace_history(&self.history).await {
            tracing::warn!("history persist failed (best-effort): {}", e);
        }
    }

    /// Reset to just the system message and persist the empty history.
    pub async fn clear(&mut self) {
        self.history.clear();
        self.pending_assistant = false;
        self.persist().await;
    }

    /// Archive the current history under `name` (derived from the first
    /// user message when absent), then clear. The archive write is
    /// best-effort; returns the name actually used.
    pub async fn save_to_archive(&mut self, name: Option<&str>) -> String {
        let name = match name {
            Some(n) if !n.trim().is_empty() => sanitize_archive_name(n),
            _ => {
                let first_user = self
                    .history
                    .iter()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("");
                sanitize_archive_name(first_user)
            }
        };

        if let Err(e) = self.brain.save_archive(&name, &self.history).await {
            tracing::warn!("archive save failed (best-effort): {}", e);
        }

        self.clear().await;
        name
    }

    /// Replace the history with an archive's content, keeping the current
    /// system message. On error the conversation is unchanged.
    pub async fn load_from_archive(&mut self, name: &str) -> Result<()> {
        let history = self
            .brain
            .load_archive(name)
            .await
            .with_context(|| format!("could not load archive {}", name))?;
        self.history = history;
        self.pending_assistant = false;
        self.persist().await;
        Ok(())
    }
}

/// Archive names: alphanumerics and spaces only, whitespace runs collapsed
/// to a single underscore, capped at 40 chars, "chat" when nothing is left.
pub fn sanitize_archive_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.chars().take(40).collect();
    if truncated.is_empty() {
        "chat".to_string()
    } else {
        truncated
    }
}
