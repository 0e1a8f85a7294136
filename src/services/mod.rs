pub mod brain;
pub mod prompts;
pub mod session;
pub mod status;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use brain::{BrainStore, HttpBrain};
pub use prompts::{SystemPromptManager, DEFAULT_SYSTEM_PROMPT};
pub use session::{SessionCoordinator, SessionEvent, SessionState, SubmitOutcome};
pub use status::spawn_status_watcher;
pub use store::ConversationStore;
