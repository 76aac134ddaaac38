use anyhow::Result;
use clap_serde_derive::ClapSerde;

use crate::model::candle::{Architecture, ModelSettings};

pub const DEFAULT_CONFIG_FILE: &str = "TextGenerator.toml";

#[derive(ClapSerde, Debug, Clone)]
pub struct Config {
    /// The address the listener binds to
    #[default("0.0.0.0".to_string())]
    #[arg(short, long, env)]
    pub address: String,

    /// The port the listener binds to
    #[default(5000)]
    #[arg(short, long, env)]
    pub port: u16,

    /// API keys accepted in the MS-API-Key header
    #[default(Vec::new())]
    #[arg(long, env, value_delimiter = ',')]
    pub api_keys: Vec<String>,

    /// Hugging Face repository holding the GGUF weights
    #[default("lmz/candle-quantized-phi".to_string())]
    #[arg(long, env)]
    pub model_repo: String,

    /// Revision of the model repository
    #[default("main".to_string())]
    #[arg(long, env)]
    pub model_revision: String,

    /// Architecture of the weights file
    #[default(Architecture::Phi2)]
    #[arg(long, env, value_enum)]
    pub architecture: Architecture,

    /// Repository holding the tokenizer, defaults to the model repository when empty
    #[default(String::new())]
    #[arg(long, env)]
    pub tokenizer_repo: String,

    /// Tokenizer file inside the tokenizer repository
    #[default("tokenizer-puffin-phi-v2.json".to_string())]
    #[arg(long, env)]
    pub tokenizer_file: String,

    /// GGUF weights file inside the model repository
    #[default("model-puffin-phi-v2-q80.gguf".to_string())]
    #[arg(long, env)]
    pub weights_file: String,

    /// Template applied to every prompt, `{prompt}` is replaced by the seed text
    #[default("Instruct: {prompt}\nOutput:".to_string())]
    #[arg(long, env)]
    pub prompt_template: String,

    /// Sampling temperature used when do_sample is set
    #[default(0.8)]
    #[arg(long, env)]
    pub temperature: f64,

    /// Nucleus sampling probability used when do_sample is set
    #[default(0.9)]
    #[arg(long, env)]
    pub top_p: f64,

    /// Sampling seed, 0 picks a random seed for every request
    #[default(0)]
    #[arg(long, env)]
    pub seed: u64,

    /// Penalty applied to recently generated tokens, 1.0 disables it
    #[default(1.1)]
    #[arg(long, env)]
    pub repeat_penalty: f32,

    /// Number of trailing tokens the repeat penalty looks at
    #[default(64)]
    #[arg(long, env)]
    pub repeat_context_size: usize,

    /// Largest max_tokens value a request may ask for
    #[default(1024)]
    #[arg(long, env)]
    pub max_tokens_limit: usize,

    /// Leave internal failure details out of 500 responses
    #[default(false)]
    #[arg(long, env)]
    pub redact_errors: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let opt: <Config as ClapSerde>::Opt = toml::from_str(&str)?;
        Ok(Config::from(opt))
    }

    pub fn model_settings(&self) -> ModelSettings {
        let tokenizer_repo = if self.tokenizer_repo.is_empty() {
            self.model_repo.clone()
        } else {
            self.tokenizer_repo.clone()
        };
        ModelSettings {
            architecture: self.architecture,
            model_repo: self.model_repo.clone(),
            model_revision: self.model_revision.clone(),
            tokenizer_repo,
            tokenizer_file: self.tokenizer_file.clone(),
            weights_file: self.weights_file.clone(),
            prompt_template: self.prompt_template.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            seed: (self.seed != 0).then_some(self.seed),
            repeat_penalty: self.repeat_penalty,
            repeat_context_size: self.repeat_context_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_quantized_phi() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert!(config.api_keys.is_empty());
        assert_eq!(config.architecture, Architecture::Phi2);
        assert_eq!(config.max_tokens_limit, 1024);
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let opt: <Config as ClapSerde>::Opt = toml::from_str(
            r#"
            port = 8080
            api_keys = ["AAAAAA", "BBBBB"]
            architecture = "llama"
            "#,
        )
        .unwrap();
        let config = Config::from(opt);
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_keys, vec!["AAAAAA", "BBBBB"]);
        assert_eq!(config.architecture, Architecture::Llama);
        assert_eq!(config.address, "0.0.0.0");
    }

    #[test]
    fn empty_tokenizer_repo_falls_back_to_model_repo() {
        let settings = Config::default().model_settings();
        assert_eq!(settings.tokenizer_repo, "lmz/candle-quantized-phi");
        assert_eq!(settings.seed, None);
    }
}
