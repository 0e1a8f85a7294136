pub mod backend;
pub mod message;
pub mod params;

pub use backend::{BackendKind, BackendStatus};
pub use message::{Message, Role};
pub use params::{GenerationParams, LoadSpec};
