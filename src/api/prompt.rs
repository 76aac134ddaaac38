use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};
use crate::model::GenerationOptions;

pub const MISSING_BODY_MESSAGE: &str =
    "Missing JSON payload, please provide a JSON payload with seed_text field";
pub const MISSING_SEED_TEXT_MESSAGE: &str = "Please provide a JSON payload with seed_text field";
pub const EMPTY_SEED_TEXT_MESSAGE: &str = "seed_text must not be empty";

#[derive(Deserialize, Serialize, Debug)]
pub struct PromptResponse {
    pub generated_text: String,
}

/// JSON payload of `/v2/prompt`. Absent overrides fall back to [`GenerationOptions::PROMPT_V2`].
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct PromptRequestV2 {
    pub seed_text: String,
    pub max_tokens: Option<i64>,
    pub return_full_text: Option<bool>,
    pub do_sample: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct PromptResponseV2 {
    pub generated_text: String,
    pub parameters_used: GenerationOptions,
}

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            status: "ok".into(),
            message: message.into(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CapabilitiesResponse {
    pub message: String,
    pub capabilities: Capabilities,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Capabilities {
    pub generate_text: String,
    pub generate_text_v2: String,
    pub model_name: String,
}

impl PromptRequestV2 {
    /// Parses a raw request body, telling apart a missing body, malformed JSON and a
    /// missing `seed_text` field.
    pub fn from_body(body: &Bytes) -> ServiceResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ServiceError::InvalidRequest(MISSING_BODY_MESSAGE.into()));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ServiceError::InvalidRequest(format!("Malformed JSON payload: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(ServiceError::InvalidRequest(
                "Malformed JSON payload: expected a JSON object".into(),
            ));
        };
        if fields.get("seed_text").map_or(true, Value::is_null) {
            return Err(ServiceError::InvalidRequest(
                MISSING_SEED_TEXT_MESSAGE.into(),
            ));
        }
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ServiceError::InvalidRequest(format!("Invalid field: {e}")))
    }

    /// Validates the overrides and merges them over the endpoint defaults.
    pub fn options(&self, max_tokens_limit: usize) -> ServiceResult<GenerationOptions> {
        if self.seed_text.is_empty() {
            return Err(ServiceError::InvalidRequest(EMPTY_SEED_TEXT_MESSAGE.into()));
        }
        let defaults = GenerationOptions::PROMPT_V2;
        let max_new_tokens = match self.max_tokens {
            None => defaults.max_new_tokens,
            Some(n) if n <= 0 => {
                return Err(ServiceError::InvalidRequest(
                    "max_tokens must be a positive integer".into(),
                ))
            }
            Some(n) => {
                let n = usize::try_from(n).unwrap_or(usize::MAX);
                if n > max_tokens_limit {
                    return Err(ServiceError::InvalidRequest(format!(
                        "max_tokens must not exceed {max_tokens_limit}"
                    )));
                }
                n
            }
        };

        Ok(GenerationOptions {
            max_new_tokens,
            return_full_text: self.return_full_text.unwrap_or(defaults.return_full_text),
            do_sample: self.do_sample.unwrap_or(defaults.do_sample),
        })
    }
}
