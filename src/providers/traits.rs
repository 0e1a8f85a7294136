use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{BackendError, InferPayload, StreamEvent};
use crate::models::{BackendKind, BackendStatus, LoadSpec};

/// Capability surface every chat backend implements. Selected once per
/// backend switch; never dispatched on by string comparison.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Make sure a model is available for inference. The local backend
    /// checks its status endpoint and issues a load request if needed; the
    /// remote backends trust their external process and do nothing.
    async fn ensure_ready(&self, spec: &LoadSpec) -> Result<(), BackendError>;

    /// Issue a streaming completion request, feeding incremental text
    /// through `tx` until `Done` or `Error`.
    async fn infer(
        &self,
        payload: InferPayload,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), BackendError>;

    /// Stop an in-flight generation server-side. Default: nothing to do
    /// beyond dropping the client read.
    async fn cancel(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Release the loaded model. Only meaningful for the local backend.
    async fn unload(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// One badge refresh. Transport failures come back as
    /// `BackendStatus::Offline`, not as errors.
    async fn poll_status(&self) -> BackendStatus;
}
