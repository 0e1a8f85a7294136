use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::brain::BrainStore;
use super::prompts::SystemPromptManager;
use super::status::spawn_status_watcher;
use super::store::ConversationStore;
use crate::models::{BackendKind, BackendStatus, GenerationParams, LoadSpec};
use crate::providers::router::BackendRouter;
use crate::providers::traits::ChatBackend;
use crate::providers::types::{InferPayload, StreamEvent, HOSTED_MODEL_AUTO};

/// Where the coordinator is in the submit cycle. Anything but `Idle`
/// rejects new submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReadiness,
    Streaming,
}

/// Render-driving notifications emitted during a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user message is in the transcript; redraw.
    UserAppended,
    /// The in-progress assistant message grew; `content` is its full text
    /// so far.
    Token { content: String },
    /// The assistant message is complete and persisted.
    Completed { content: String },
    /// User-initiated abort; the partial assistant message was discarded.
    Cancelled,
    /// Generation failed; the submission was rolled back.
    Failed { error: String },
}

/// How one call to [`SessionCoordinator::submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    /// Blank input; nothing happened.
    EmptyInput,
    /// A generation was already in flight; nothing happened.
    Busy,
    /// The backend could not produce a ready model.
    NotReady,
    Cancelled,
    Failed,
}

/// Orchestrates user-submit → backend readiness → streaming → persistence,
/// owning the single-in-flight-generation invariant and the current backend
/// selection. All conversation mutation happens from this type's call
/// sites; background timers never touch it.
pub struct SessionCoordinator {
    store: ConversationStore,
    prompts: SystemPromptManager,
    router: BackendRouter,
    active: BackendKind,
    load_spec: LoadSpec,
    hosted_model: Option<String>,
    state: SessionState,
    watcher_token: Option<CancellationToken>,
}

impl SessionCoordinator {
    /// Build a session from the persisted brain state. Never fails; a
    /// missing or broken brain yields a default prompt and empty history.
    pub async fn start(
        brain: Arc<dyn BrainStore>,
        router: BackendRouter,
        active: BackendKind,
    ) -> Self {
        let store = ConversationStore::load(brain.clone()).await;
        let prompts = SystemPromptManager::new(brain);
        Self {
            store,
            prompts,
            router,
            active,
            load_spec: LoadSpec::default(),
            hosted_model: None,
            state: SessionState::Idle,
            watcher_token: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn prompts(&self) -> &SystemPromptManager {
        &self.prompts
    }

    /// Local model selection and load parameters, used by the next
    /// readiness check.
    pub fn set_load_spec(&mut self, spec: LoadSpec) {
        self.load_spec = spec;
    }

    /// Model id for the hosted backend; `None` means the provider's
    /// auto-router.
    pub fn set_hosted_model(&mut self, model: Option<String>) {
        self.hosted_model = model;
    }

    /// Run one full submission. Events fire on `on_event` as the transcript
    /// changes; `cancel` aborts the stream and discards the partial
    /// assistant message.
    pub async fn submit<F>(
        &mut self,
        text: &str,
        params: GenerationParams,
        cancel: CancellationToken,
        mut on_event: F,
    ) -> SubmitOutcome
    where
        F: FnMut(SessionEvent) + Send,
    {
        if self.state != SessionState::Idle {
            return SubmitOutcome::Busy;
        }
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::EmptyInput;
        }
        let backend = match self.router.get(self.active) {
            Some(b) => b,
            None => {
                on_event(SessionEvent::Failed {
                    error: format!("no backend registered for {}", self.active.as_str()),
                });
                return SubmitOutcome::Failed;
            }
        };

        self.state = SessionState::AwaitingReadiness;
        self.store.append_user(text);
        self.store.persist().await;
        on_event(SessionEvent::UserAppended);

        // Resolved fresh on every submission, never cached: edits to the
        // prompt between turns must take effect immediately.
        let system_prompt = self.prompts.active().await;
        self.store.begin_assistant();

        if let Err(e) = backend.ensure_ready(&self.load_spec).await {
            self.store.discard_pending();
            self.store.persist().await;
            self.state = SessionState::Idle;
            on_event(SessionEvent::Failed {
                error: e.to_string(),
            });
            return SubmitOutcome::NotReady;
        }

        let mut payload = InferPayload::new(self.store.payload_messages(&system_prompt), params);
        if self.active == BackendKind::RemoteHosted {
            payload.model = Some(
                self.hosted_model
                    .clone()
                    .unwrap_or_else(|| HOSTED_MODEL_AUTO.to_string()),
            );
        }

        self.state = SessionState::Streaming;
        let outcome = self.run_stream(backend, payload, cancel, &mut on_event).await;
        self.state = SessionState::Idle;
        outcome
    }

    /// Drive one completion stream into the pending assistant message.
    async fn run_stream<F>(
        &mut self,
        backend: Arc<dyn ChatBackend>,
        payload: InferPayload,
        cancel: CancellationToken,
        on_event: &mut F,
    ) -> SubmitOutcome
    where
        F: FnMut(SessionEvent) + Send,
    {
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

        let infer_backend = backend.clone();
        let _stream_handle = tokio::spawn(async move {
            if let Err(e) = infer_backend.infer(payload, tx.clone()).await {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
            }
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    rx.close();
                    // Stops server-side generation promptly; the client
                    // abort alone only stops the read. Completion order
                    // against the stream teardown is not guaranteed.
                    if let Err(e) = backend.cancel().await {
                        tracing::warn!("server-side cancel failed (best-effort): {}", e);
                    }
                    self.store.discard_pending();
                    self.store.persist().await;
                    on_event(SessionEvent::Cancelled);
                    return SubmitOutcome::Cancelled;
                }
                event = rx.recv() => {
                    match event {
                        Some(StreamEvent::Token(token)) => {
                            self.store.append_chunk(&token);
                            on_event(SessionEvent::Token {
                                content: self.store.pending_content().to_string(),
                            });
                        }
                        Some(StreamEvent::Done) => {
                            self.store.complete_pending();
                            self.store.persist().await;
                            let content = self
                                .store
                                .transcript()
                                .last()
                                .map(|m| m.content.clone())
                                .unwrap_or_default();
                            on_event(SessionEvent::Completed { content });
                            return SubmitOutcome::Completed;
                        }
                        Some(StreamEvent::Error(error)) => {
                            self.store.rollback_submission();
                            self.store.persist().await;
                            on_event(SessionEvent::Failed { error });
                            return SubmitOutcome::Failed;
                        }
                        None => {
                            self.store.rollback_submission();
                            self.store.persist().await;
                            on_event(SessionEvent::Failed {
                                error: "stream ended unexpectedly".to_string(),
                            });
                            return SubmitOutcome::Failed;
                        }
                    }
                }
            }
        }
    }

    /// Start badge polling for the active backend, stopping any watcher
    /// from a previous selection first. Returns `None` when no backend is
    /// registered for the active kind. The watcher dies on the next
    /// [`switch_backend`](Self::switch_backend) or
    /// [`stop_status_watcher`](Self::stop_status_watcher) call.
    pub fn watch_active_backend<F>(&mut self, on_status: F) -> Option<JoinHandle<()>>
    where
        F: FnMut(BackendKind, BackendStatus) + Send + 'static,
    {
        self.stop_status_watcher();
        let backend = self.router.get(self.active)?;
        let token = CancellationToken::new();
        self.watcher_token = Some(token.clone());
        Some(spawn_status_watcher(backend, token, on_status))
    }

    /// Cancel the active backend's status watcher, if one is running.
    pub fn stop_status_watcher(&mut self) {
        if let Some(token) = self.watcher_token.take() {
            token.cancel();
        }
    }

    /// Change the active backend. The outgoing backend's status watcher is
    /// cancelled (un-viewed backends generate no polling chatter; restart
    /// one for the new selection with
    /// [`watch_active_backend`](Self::watch_active_backend)), and leaving
    /// the local engine while it holds a model releases it first
    /// (best-effort), so VRAM is not kept pinned.
    pub async fn switch_backend(&mut self, kind: BackendKind) {
        if kind == self.active {
            return;
        }

        self.stop_status_watcher();

        if self.active == BackendKind::Local {
            if let Some(local) = self.router.get(BackendKind::Local) {
                if matches!(local.poll_status().await, BackendStatus::Loaded { .. }) {
                    if let Err(e) = local.unload().await {
                        tracing::warn!("unload on backend switch failed (best-effort): {}", e);
                    }
                }
            }
        }

        self.active = kind;
    }

    /// Reset the conversation to just the system message.
    pub async fn clear(&mut self) {
        self.store.clear().await;
    }

    /// Archive the current conversation and start fresh. Returns the
    /// archive name used.
    pub async fn save_to_archive(&mut self, name: Option<&str>) -> String {
        self.store.save_to_archive(name).await
    }

    /// Replace the conversation with an archived one, keeping the current
    /// system message.
    pub async fn load_from_archive(&mut self, name: &str) -> anyhow::Result<()> {
        self.store.load_from_archive(name).await
    }

    #[cfg(test)]
    fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }
}
