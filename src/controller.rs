use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::api::auth::API_KEY_HEADER;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/v1/prompt";
pub const MAX_PROMPT_WORDS: usize = 512;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(
        "Prompt is too long. Please provide a prompt with less than {} words.",
        MAX_PROMPT_WORDS
    )]
    Validation,
    #[error("Error: {0}")]
    Remote(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct RemoteBody {
    generated_text: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

/// Anything a front end can ask for generated text.
pub trait GenerateText {
    fn generate_text(&self, prompt: &str) -> Result<String, ControllerError>;
}

/// Client side of the service: checks the prompt locally and forwards it to `/v1/prompt`.
pub struct TextController {
    client: Client,
    api_url: Url,
    api_key: Option<String>,
}

impl TextController {
    /// `timeout` of `None` waits for the server indefinitely.
    pub fn new(
        api_url: Url,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ControllerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

impl GenerateText for TextController {
    #[tracing::instrument(level = "info", skip_all)]
    fn generate_text(&self, prompt: &str) -> Result<String, ControllerError> {
        if prompt.split_whitespace().count() > MAX_PROMPT_WORDS {
            return Err(ControllerError::Validation);
        }

        let mut request = self
            .client
            .get(self.api_url.clone())
            .query(&[("seed_text", prompt)]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "generation request failed");
            let reason = response
                .json::<RemoteBody>()
                .ok()
                .and_then(|body| match (body.error, body.message) {
                    (Some(error), Some(message)) => Some(format!("{error}: {message}")),
                    (error, _) => error,
                })
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ControllerError::Remote(reason));
        }

        let body: RemoteBody = response.json()?;
        Ok(body.generated_text.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_prompt_fails_before_any_request() {
        // nothing listens on this port, a request would surface as a transport error
        let controller = TextController::new(
            Url::parse("http://127.0.0.1:9/v1/prompt").unwrap(),
            None,
            Some(Duration::from_millis(200)),
        )
        .unwrap();
        let prompt = vec!["word"; MAX_PROMPT_WORDS + 1].join(" ");
        assert!(matches!(
            controller.generate_text(&prompt),
            Err(ControllerError::Validation)
        ));
    }

    #[test]
    fn error_messages_read_like_the_service() {
        assert_eq!(
            ControllerError::Remote("Unknown error".into()).to_string(),
            "Error: Unknown error"
        );
    }
}
