use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{BackendKind, BackendStatus};
use crate::providers::traits::ChatBackend;

/// Poll a backend's status endpoint on its cadence, feeding each result to
/// the badge callback. Polls once immediately, then on the interval. Cancel
/// the token when the backend stops being the active selection so un-viewed
/// backends generate no network chatter.
pub fn spawn_status_watcher<F>(
    backend: Arc<dyn ChatBackend>,
    token: CancellationToken,
    mut on_status: F,
) -> JoinHandle<()>
where
    F: FnMut(BackendKind, BackendStatus) + Send + 'static,
{
    let kind = backend.kind();
    let mut interval = tokio::time::interval(kind.poll_interval());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = interval.tick() => {
                    let status = backend.poll_status().await;
                    on_status(kind, status);
                }
            }
        }
    })
}
