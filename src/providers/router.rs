use std::collections::HashMap;
use std::sync::Arc;

use super::traits::ChatBackend;
use crate::models::BackendKind;

/// Registry of the configured backends, keyed by kind. The coordinator
/// resolves the active kind through here once per operation.
pub struct BackendRouter {
    backends: HashMap<BackendKind, Arc<dyn ChatBackend>>,
}

impl BackendRouter {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Arc<dyn ChatBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn ChatBackend>> {
        self.backends.get(&kind).cloned()
    }
}

impl Default for BackendRouter {
    fn default() -> Self {
        Self::new()
    }
}
