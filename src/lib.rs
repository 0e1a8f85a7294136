//! Chat session core for a locally hosted multi-model media studio.
//!
//! The studio backend does all inference, persistence and audio/video work;
//! this crate owns the client-side state that surrounds it: a persisted
//! conversation, three swappable completion backends (an on-device engine,
//! an always-on managed app, and a hosted multi-model API), streaming
//! response consumption, and the submit state machine that keeps at most
//! one generation in flight.
//!
//! Entry point: [`services::SessionCoordinator`].

pub mod models;
pub mod providers;
pub mod services;

pub use models::{BackendKind, BackendStatus, GenerationParams, LoadSpec, Message, Role};
pub use providers::{
    BackendError, BackendRouter, ChatBackend, InferPayload, LocalBackend, ModelInfo,
    RemoteHostedBackend, RemoteManagedBackend, StreamEvent, HOSTED_MODEL_AUTO,
};
pub use services::{
    spawn_status_watcher, BrainStore, ConversationStore, HttpBrain, SessionCoordinator,
    SessionEvent, SessionState, SubmitOutcome, SystemPromptManager, DEFAULT_SYSTEM_PROMPT,
};
