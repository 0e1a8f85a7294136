pub mod local;
pub mod remote_hosted;
pub mod remote_managed;
pub mod router;
pub mod stream;
pub mod traits;
pub mod types;

pub use local::LocalBackend;
pub use remote_hosted::RemoteHostedBackend;
pub use remote_managed::RemoteManagedBackend;
pub use router::BackendRouter;
pub use traits::ChatBackend;
pub use types::{BackendError, InferPayload, ModelInfo, StreamEvent, HOSTED_MODEL_AUTO};
