#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};

use text_generator::api::auth::ApiKeys;
use text_generator::model::{GenerationOptions, ModelHandle, ModelLoader, ModelSlot, TextGenerator};
use text_generator::{build_router, AppState};

pub const VALID_KEY: &str = "AAAAAA";

/// Replies with a deterministic continuation of the prompt.
pub struct EchoGenerator;

impl TextGenerator for EchoGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let completion = format!(" continued in {} tokens", options.max_new_tokens);
        if options.return_full_text {
            Ok(format!("{prompt}{completion}"))
        } else {
            Ok(completion)
        }
    }
}

pub struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
        bail!("tensor shape mismatch in layer 3")
    }
}

/// Hands out numbered echo models and counts how often it was asked to.
#[derive(Default)]
pub struct CountingLoader {
    pub loads: AtomicUsize,
    pub failing: bool,
}

impl ModelLoader for CountingLoader {
    fn load(&self) -> Result<ModelHandle> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            Ok(ModelHandle::new("test/failing", FailingGenerator))
        } else {
            Ok(ModelHandle::new(format!("test/echo-{n}"), EchoGenerator))
        }
    }
}

pub async fn app_with(loader: Arc<CountingLoader>, redact_errors: bool) -> axum::Router {
    let model = ModelSlot::initialize(loader).await.unwrap();
    build_router(AppState {
        model: Arc::new(model),
        api_keys: Arc::new(ApiKeys::new(["AAAAAA", "BBBBB", "CCCCC"])),
        max_tokens_limit: 1024,
        redact_errors,
    })
}

pub async fn app() -> (axum::Router, Arc<CountingLoader>) {
    let loader = Arc::new(CountingLoader::default());
    (app_with(loader.clone(), false).await, loader)
}
