use anyhow::Result;
use candle_core::Device;
use candle_transformers::generation::LogitsProcessor;
use clap::ValueEnum;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use rand::random;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::generator::{GenerationOptions, ModelHandle, ModelLoader, TextGenerator};
use crate::model::text_pipeline::TextGeneratorPipeline;

const PROMPT_PLACEHOLDER: &str = "{prompt}";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Quantized mixformer weights (Phi-2 family)
    Phi2,
    /// Quantized llama weights (Llama, Mistral, TinyLlama, ...)
    Llama,
}

/// Everything needed to fetch and run one model.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub architecture: Architecture,
    pub model_repo: String,
    pub model_revision: String,
    pub tokenizer_repo: String,
    pub tokenizer_file: String,
    pub weights_file: String,
    pub prompt_template: String,
    pub temperature: f64,
    pub top_p: f64,
    pub seed: Option<u64>,
    pub repeat_penalty: f32,
    pub repeat_context_size: usize,
}

impl ModelSettings {
    pub fn render_prompt(&self, seed_text: &str) -> String {
        if self.prompt_template.contains(PROMPT_PLACEHOLDER) {
            self.prompt_template.replace(PROMPT_PLACEHOLDER, seed_text)
        } else {
            format!("{}{}", self.prompt_template, seed_text)
        }
    }

    fn logits_processor(&self, options: &GenerationOptions) -> LogitsProcessor {
        let seed = self.seed.unwrap_or_else(random);
        if options.do_sample {
            LogitsProcessor::new(seed, Some(self.temperature), Some(self.top_p))
        } else {
            // no temperature means argmax
            LogitsProcessor::new(seed, None, None)
        }
    }
}

/// Loads GGUF weights and a tokenizer from the Hugging Face hub.
pub struct CandleModelLoader {
    settings: ModelSettings,
}

impl CandleModelLoader {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }
}

impl ModelLoader for CandleModelLoader {
    #[tracing::instrument(level = "info", skip(self), fields(repo = %self.settings.model_repo))]
    fn load(&self) -> Result<ModelHandle> {
        let settings = &self.settings;
        let api = Api::new()?;
        let model_repo = api.repo(Repo::with_revision(
            settings.model_repo.clone(),
            RepoType::Model,
            settings.model_revision.clone(),
        ));
        let tokenizer_file = if settings.tokenizer_repo == settings.model_repo {
            model_repo.get(&settings.tokenizer_file)?
        } else {
            api.repo(Repo::new(settings.tokenizer_repo.clone(), RepoType::Model))
                .get(&settings.tokenizer_file)?
        };
        let gguf_file = model_repo.get(&settings.weights_file)?;

        let device = Device::cuda_if_available(0)?;
        info!(
            cuda = device.is_cuda(),
            avx = candle_core::utils::with_avx(),
            neon = candle_core::utils::with_neon(),
            f16c = candle_core::utils::with_f16c(),
            "selected compute device"
        );

        let pipeline = match settings.architecture {
            Architecture::Phi2 => TextGeneratorPipeline::with_phi2(
                &gguf_file,
                &tokenizer_file,
                device,
                settings.repeat_penalty,
                settings.repeat_context_size,
            )?,
            Architecture::Llama => TextGeneratorPipeline::with_llama(
                &gguf_file,
                &tokenizer_file,
                device,
                settings.repeat_penalty,
                settings.repeat_context_size,
            )?,
        };

        Ok(ModelHandle::new(
            settings.model_repo.clone(),
            CandleTextGenerator {
                settings: settings.clone(),
                pipeline,
            },
        ))
    }
}

pub struct CandleTextGenerator {
    settings: ModelSettings,
    pipeline: TextGeneratorPipeline,
}

impl TextGenerator for CandleTextGenerator {
    #[tracing::instrument(level = "info", skip(self, seed_text))]
    fn generate(&self, seed_text: &str, options: &GenerationOptions) -> Result<String> {
        let prompt = self.settings.render_prompt(seed_text);
        // weights are shared between clones, the KV cache is not
        let mut pipeline = self.pipeline.clone();
        let mut logits_processor = self.settings.logits_processor(options);
        let (completion, produced) =
            pipeline.generate(&prompt, options.max_new_tokens, &mut logits_processor)?;
        debug!(produced, "completion ready");

        if options.return_full_text {
            Ok(format!("{prompt}{completion}"))
        } else {
            Ok(completion)
        }
    }
}
