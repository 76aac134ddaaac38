use std::path::Path;

use anyhow::{anyhow, bail, Result};
use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::mixformer;
use candle_transformers::models::quantized_llama::ModelWeights;
use candle_transformers::models::quantized_mixformer::MixFormerSequentialForCausalLM as Phi2;
use candle_transformers::quantized_var_builder::VarBuilder;
use tokenizers::Tokenizer;
use tracing::debug;

const EOS_TOKENS: [&str; 4] = ["<|endoftext|>", "</s>", "<|eot_id|>", "<|im_end|>"];

// Adapted from
// https://github.com/huggingface/candle/blob/main/candle-examples/examples/phi/main.rs
// https://github.com/huggingface/candle/blob/main/candle-examples/examples/quantized/main.rs
#[derive(Clone)]
pub struct TextGeneratorPipeline {
    model: Model,
    device: Device,
    tokenizer: Tokenizer,
    eos_token: u32,
    pub repeat_penalty: f32,
    pub repeat_context_size: usize,
}

#[derive(Clone)]
pub enum Model {
    Phi2(Phi2),
    Llama(ModelWeights),
}

impl TextGeneratorPipeline {
    pub fn with_phi2(
        gguf_file: &Path,
        tokenizer_file: &Path,
        device: Device,
        repeat_penalty: f32,
        repeat_context_size: usize,
    ) -> Result<Self> {
        let vb = VarBuilder::from_gguf(gguf_file, &device)?;
        let model = Phi2::new(&mixformer::Config::puffin_phi_v2(), vb)?;
        Self::new(
            Model::Phi2(model),
            device,
            tokenizer_file,
            repeat_penalty,
            repeat_context_size,
        )
    }

    pub fn with_llama(
        gguf_file: &Path,
        tokenizer_file: &Path,
        device: Device,
        repeat_penalty: f32,
        repeat_context_size: usize,
    ) -> Result<Self> {
        let mut file = std::fs::File::open(gguf_file)?;
        let content = gguf_file::Content::read(&mut file).map_err(|e| e.with_path(gguf_file))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)?;
        Self::new(
            Model::Llama(model),
            device,
            tokenizer_file,
            repeat_penalty,
            repeat_context_size,
        )
    }

    fn new(
        model: Model,
        device: Device,
        tokenizer_file: &Path,
        repeat_penalty: f32,
        repeat_context_size: usize,
    ) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_file).map_err(anyhow::Error::msg)?;
        let eos_token = EOS_TOKENS
            .iter()
            .find_map(|token| tokenizer.token_to_id(token))
            .ok_or_else(|| anyhow!("Cannot find an end of sequence token in the tokenizer"))?;

        Ok(Self {
            model,
            device,
            tokenizer,
            eos_token,
            repeat_penalty,
            repeat_context_size,
        })
    }

    /// Runs the decoding loop and returns the completion without the prompt, together with
    /// the number of produced tokens.
    pub fn generate(
        &mut self,
        prompt: &str,
        max_new_tokens: usize,
        logits_processor: &mut LogitsProcessor,
    ) -> Result<(String, usize)> {
        if let Model::Phi2(ref mut m) = self.model {
            m.clear_kv_cache();
        }
        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        if tokens.is_empty() {
            bail!("Prompt is empty");
        }

        let prompt_len = tokens.len();
        let start_gen = std::time::Instant::now();
        for index in 0..max_new_tokens {
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = match &mut self.model {
                Model::Phi2(model) => model.forward(&input)?,
                Model::Llama(model) => model.forward(&input, start_pos)?,
            };
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = if (self.repeat_penalty - 1.).abs() < f32::EPSILON {
                logits
            } else {
                let start_at = tokens.len().saturating_sub(self.repeat_context_size);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.repeat_penalty,
                    &tokens[start_at..],
                )?
            };

            let next_token = logits_processor.sample(&logits)?;
            if next_token == self.eos_token {
                break;
            }
            tokens.push(next_token);
        }

        let generated = &tokens[prompt_len..];
        let output = self
            .tokenizer
            .decode(generated, true)
            .map_err(|e| anyhow!("Cannot decode tokens: {e}"))?;
        debug!(
            tokens = generated.len(),
            seconds = start_gen.elapsed().as_secs_f64(),
            "generation finished"
        );

        Ok((output, generated.len()))
    }
}
