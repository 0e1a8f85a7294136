use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{GenerationParams, Message};

/// Marker the local engine embeds in load errors for models its build
/// cannot run; mapped to a distinguished error so the UI can say more
/// than "load failed".
pub const INCOMPATIBLE_MARKER: &str = "INCOMPATIBLE";

/// Default model id for the hosted backend when the user has not picked one.
pub const HOSTED_MODEL_AUTO: &str = "openrouter/auto";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Offline(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Incompatible model: {0}")]
    IncompatibleModel(String),

    #[error("No model selected")]
    NoModelSelected,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Everything an adapter needs to issue one completion request. The message
/// list already carries the freshly resolved system prompt at the front and
/// excludes the in-progress assistant placeholder.
#[derive(Debug, Clone)]
pub struct InferPayload {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
    /// Model id for the hosted backend; ignored by the other two.
    pub model: Option<String>,
}

impl InferPayload {
    pub fn new(messages: Vec<Message>, params: GenerationParams) -> Self {
        Self {
            messages,
            params,
            model: None,
        }
    }
}

/// Incremental events produced while draining one completion stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Token(String),
    Done,
    Error(String),
}

/// A selectable model on the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body shared by all three infer endpoints: the message list plus
/// the six sampling parameters, flattened. The hosted backend adds `model`.
#[derive(Serialize)]
pub(crate) struct InferBody<'a> {
    pub messages: &'a [Message],
    #[serde(flatten)]
    pub params: GenerationParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

impl<'a> InferBody<'a> {
    pub fn from_payload(payload: &'a InferPayload) -> Self {
        Self {
            messages: &payload.messages,
            params: payload.params,
            model: payload.model.as_deref(),
        }
    }
}

pub(crate) fn transport_err(e: reqwest::Error) -> BackendError {
    BackendError::Offline(e.to_string())
}

/// Map a non-success HTTP response to the taxonomy, preferring the server's
/// own `{"error": ...}` text when it parses.
pub(crate) fn status_err(status: reqwest::StatusCode, body: &str) -> BackendError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => format!("HTTP {}", status.as_u16()),
    };

    if detail.contains(INCOMPATIBLE_MARKER) {
        BackendError::IncompatibleModel(detail)
    } else {
        BackendError::Backend(detail)
    }
}
