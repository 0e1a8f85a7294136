use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The three interchangeable chat-completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// On-device engine whose model this client loads and unloads.
    Local,
    /// Always-running external inference app (LM Studio style); queried,
    /// never managed.
    RemoteManaged,
    /// Cloud-hosted multi-model API requiring a model id per request.
    RemoteHosted,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::RemoteManaged => "remote-managed",
            BackendKind::RemoteHosted => "remote-hosted",
        }
    }

    /// Badge-refresh cadence. The managed backend can change out from under
    /// us at any time, so it polls faster than the idle rate.
    pub fn poll_interval(&self) -> Duration {
        match self {
            BackendKind::RemoteManaged => Duration::from_secs(4),
            _ => Duration::from_secs(8),
        }
    }
}

/// User-visible readiness of a backend, as reported by its status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Loaded { model: String },
    Loading,
    NotLoaded,
    Connected,
    Unauthorized,
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_intervals() {
        assert_eq!(
            BackendKind::RemoteManaged.poll_interval(),
            Duration::from_secs(4)
        );
        assert_eq!(BackendKind::Local.poll_interval(), Duration::from_secs(8));
        assert_eq!(
            BackendKind::RemoteHosted.poll_interval(),
            Duration::from_secs(8)
        );
    }
}
