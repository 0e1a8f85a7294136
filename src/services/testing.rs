//! In-memory fakes for exercising the session core without a backend.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::brain::BrainStore;
use crate::models::{BackendKind, BackendStatus, LoadSpec, Message};
use crate::providers::traits::ChatBackend;
use crate::providers::types::{BackendError, InferPayload, StreamEvent};

#[derive(Default)]
struct BrainState {
    active_prompt: Option<String>,
    presets: HashMap<String, String>,
    history: Vec<Message>,
    archives: HashMap<String, Vec<Message>>,
}

/// `BrainStore` backed by maps, with switchable failure injection.
#[derive(Default)]
pub struct MemoryBrain {
    state: Mutex<BrainState>,
    pub fail_prompt: Mutex<bool>,
    pub fail_history: Mutex<bool>,
    pub fail_archives: Mutex<bool>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(prompt: &str) -> Self {
        let brain = Self::default();
        brain.state.lock().unwrap().active_prompt = Some(prompt.to_string());
        brain
    }

    pub fn seed_history(&self, history: Vec<Message>) {
        self.state.lock().unwrap().history = history;
    }

    pub fn stored_history(&self) -> Vec<Message> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn stored_archive(&self, name: &str) -> Option<Vec<Message>> {
        self.state.lock().unwrap().archives.get(name).cloned()
    }

    fn check(&self, flag: &Mutex<bool>) -> Result<()> {
        if *flag.lock().unwrap() {
            Err(anyhow!("injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrainStore for MemoryBrain {
    async fn system_prompt(&self) -> Result<String> {
        self.check(&self.fail_prompt)?;
        let state = self.state.lock().unwrap();
        state
            .active_prompt
            .clone()
            .ok_or_else(|| anyhow!("no prompt"))
    }

    async fn set_system_prompt(&self, content: &str) -> Result<()> {
        self.check(&self.fail_prompt)?;
        self.state.lock().unwrap().active_prompt = Some(content.to_string());
        Ok(())
    }

    async fn preset(&self, name: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no preset {}", name))
    }

    async fn save_preset(&self, name: &str, content: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.presets.insert(name.to_string(), content.to_string());
        state.active_prompt = Some(content.to_string());
        Ok(())
    }

    async fn delete_preset(&self, name: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .presets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no preset {}", name))
    }

    async fn list_presets(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.state.lock().unwrap().presets.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn history(&self) -> Result<Vec<Message>> {
        self.check(&self.fail_history)?;
        Ok(self.state.lock().unwrap().history.clone())
    }

    async fn replace_history(&self, history: &[Message]) -> Result<()> {
        self.check(&self.fail_history)?;
        self.state.lock().unwrap().history = history.to_vec();
        Ok(())
    }

    async fn list_archives(&self) -> Result<Vec<String>> {
        self.check(&self.fail_archives)?;
        let mut names: Vec<String> = self.state.lock().unwrap().archives.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn save_archive(&self, name: &str, history: &[Message]) -> Result<()> {
        self.check(&self.fail_archives)?;
        self.state
            .lock()
            .unwrap()
            .archives
            .insert(name.to_string(), history.to_vec());
        Ok(())
    }

    async fn load_archive(&self, name: &str) -> Result<Vec<Message>> {
        self.check(&self.fail_archives)?;
        self.state
            .lock()
            .unwrap()
            .archives
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("archive {} not found", name))
    }
}

/// What a scripted inference run should do once the request is accepted.
pub enum Script {
    /// Emit these chunks, then finish normally.
    Chunks(Vec<&'static str>),
    /// Emit these chunks, then fail mid-stream.
    ChunksThenError(Vec<&'static str>, &'static str),
    /// Emit these chunks, then stall until the receiver goes away.
    ChunksThenStall(Vec<&'static str>),
}

/// `ChatBackend` that replays a script and counts management calls.
pub struct ScriptedBackend {
    pub backend_kind: BackendKind,
    pub script: Script,
    pub status: Mutex<BackendStatus>,
    pub ready_error: Mutex<Option<BackendError>>,
    pub infer_calls: Mutex<u32>,
    pub cancel_calls: Mutex<u32>,
    pub unload_calls: Mutex<u32>,
    pub last_payload: Mutex<Option<InferPayload>>,
}

impl ScriptedBackend {
    pub fn new(backend_kind: BackendKind, script: Script) -> Self {
        Self {
            backend_kind,
            script,
            status: Mutex::new(BackendStatus::Loaded {
                model: "fake".to_string(),
            }),
            ready_error: Mutex::new(None),
            infer_calls: Mutex::new(0),
            cancel_calls: Mutex::new(0),
            unload_calls: Mutex::new(0),
            last_payload: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.backend_kind
    }

    async fn ensure_ready(&self, _spec: &LoadSpec) -> Result<(), BackendError> {
        match self.ready_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn infer(
        &self,
        payload: InferPayload,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), BackendError> {
        *self.infer_calls.lock().unwrap() += 1;
        *self.last_payload.lock().unwrap() = Some(payload);

        match &self.script {
            Script::Chunks(chunks) => {
                for c in chunks {
                    let _ = tx.send(StreamEvent::Token(c.to_string())).await;
                }
                let _ = tx.send(StreamEvent::Done).await;
            }
            Script::ChunksThenError(chunks, err) => {
                for c in chunks {
                    let _ = tx.send(StreamEvent::Token(c.to_string())).await;
                }
                let _ = tx.send(StreamEvent::Error(err.to_string())).await;
            }
            Script::ChunksThenStall(chunks) => {
                for c in chunks {
                    let _ = tx.send(StreamEvent::Token(c.to_string())).await;
                }
                tx.closed().await;
            }
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<(), BackendError> {
        *self.cancel_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn unload(&self) -> Result<(), BackendError> {
        *self.unload_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn poll_status(&self) -> BackendStatus {
        self.status.lock().unwrap().clone()
    }
}
