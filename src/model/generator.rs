use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Effective decoding parameters of one generation call. Serialized as-is into the
/// `parameters_used` field of `/v2/prompt` responses.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Upper bound on the number of produced tokens
    pub max_new_tokens: usize,

    /// Whether the prompt is included in the returned text
    pub return_full_text: bool,

    /// Stochastic sampling instead of greedy decoding
    pub do_sample: bool,
}

impl GenerationOptions {
    /// Defaults of the query string endpoint.
    pub const PROMPT_V1: GenerationOptions = GenerationOptions {
        max_new_tokens: 200,
        return_full_text: true,
        do_sample: false,
    };

    /// Defaults of the JSON endpoint, each field can be overridden per request.
    pub const PROMPT_V2: GenerationOptions = GenerationOptions {
        max_new_tokens: 50,
        return_full_text: false,
        do_sample: false,
    };
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// A loaded model together with the name it is served under.
pub struct ModelHandle {
    pub name: String,
    pub generator: Box<dyn TextGenerator>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, generator: impl TextGenerator + 'static) -> Self {
        Self {
            name: name.into(),
            generator: Box::new(generator),
        }
    }

    pub fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.generator.generate(prompt, options)
    }
}

/// Builds a fresh [`ModelHandle`]. Called once at startup and again on every restart.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<ModelHandle>;
}
