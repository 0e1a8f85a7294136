use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every inference request, regardless of
/// backend. Read fresh from the configuration surface at submit time;
/// never stored on the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 8192,
            top_p: 0.95,
            top_k: 40,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

/// Parameters for bringing up the local engine: which weights to load and
/// how. `gpu_layers` of 99 means "offload everything" and is translated to
/// -1 on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSpec {
    pub model_path: Option<String>,
    pub context_size: u32,
    pub gpu_layers: u32,
}

impl Default for LoadSpec {
    fn default() -> Self {
        Self {
            model_path: None,
            context_size: 8192,
            gpu_layers: 0,
        }
    }
}

impl LoadSpec {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }

    pub fn wire_gpu_layers(&self) -> i32 {
        if self.gpu_layers == 99 {
            -1
        } else {
            self.gpu_layers as i32
        }
    }
}
