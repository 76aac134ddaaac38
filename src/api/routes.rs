use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::prompt::{
    Capabilities, CapabilitiesResponse, PromptRequestV2, PromptResponse,
    PromptResponseV2, StatusResponse,
};
use crate::api::AppState;
use crate::error::ServiceError;
use crate::model::GenerationOptions;

pub const USAGE_MESSAGE: &str = "Text generator service, please use the /v1/prompt endpoint to generate text, /v1/heartbeat for the heartbeat and /v1/capabilities for info. It is a GET endpoint so use ?seed_text=your_prompt";

type HandlerResult<T> = Result<Json<T>, Response>;

impl AppState {
    fn reject(&self, err: ServiceError) -> Response {
        err.into_response_with(self.redact_errors)
    }
}

pub async fn home() -> &'static str {
    USAGE_MESSAGE
}

pub async fn heartbeat() -> Json<StatusResponse> {
    Json(StatusResponse::ok("Text generator service is running"))
}

#[axum_macros::debug_handler]
pub async fn capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        message: "Available models".into(),
        capabilities: Capabilities {
            generate_text:
                "Generates text based on the provided seed text, endpoint /v1/prompt".into(),
            generate_text_v2:
                "Generates text from a JSON payload with optional generation parameters, endpoint /v2/prompt"
                    .into(),
            model_name: state.model.model_name().await,
        },
    })
}

#[axum_macros::debug_handler]
pub async fn restart(State(state): State<AppState>) -> HandlerResult<StatusResponse> {
    let name = state.model.restart().await.map_err(|e| state.reject(e))?;
    tracing::info!(model = %name, "restart completed");
    Ok(Json(StatusResponse::ok("Service is restarting...")))
}

#[axum_macros::debug_handler]
pub async fn prompt_v1(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> HandlerResult<PromptResponse> {
    let Query(params) = query
        .map_err(|e| state.reject(ServiceError::InvalidRequest(e.body_text())))?;
    // a repeated parameter resolves to its first value
    let seed_text = params
        .into_iter()
        .find_map(|(name, value)| (name == "seed_text").then_some(value))
        .unwrap_or_default();
    if seed_text.is_empty() {
        return Err(state.reject(ServiceError::MissingPrompt));
    }
    let generated_text = state
        .model
        .generate(seed_text, GenerationOptions::PROMPT_V1)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(PromptResponse { generated_text }))
}

#[axum_macros::debug_handler]
pub async fn prompt_v2(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match PromptRequestV2::from_body(&body) {
        Ok(request) => request,
        Err(e) => return state.reject(e),
    };
    let parameters_used = match request.options(state.max_tokens_limit) {
        Ok(options) => options,
        Err(e) => return state.reject(e),
    };

    match state
        .model
        .generate(request.seed_text, parameters_used)
        .await
    {
        Ok(generated_text) => Json(PromptResponseV2 {
            generated_text,
            parameters_used,
        })
        .into_response(),
        Err(e) => state.reject(e),
    }
}
