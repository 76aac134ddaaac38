use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MISSING_PROMPT_MESSAGE: &str = "No prompt provided, use ?seed_text as the parameter";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid API Key";

/// Errors surfaced at the HTTP boundary. Everything below the route layer works with
/// `anyhow::Result` and is converted into one of these kinds by the handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{}", MISSING_PROMPT_MESSAGE)]
    MissingPrompt,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Model load failed: {0}")]
    ModelLoad(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HttpErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&str> for HttpErrorResponse {
    fn from(error: &str) -> Self {
        HttpErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }
}

impl HttpErrorResponse {
    fn with_message(error: &str, message: String) -> Self {
        HttpErrorResponse {
            error: error.to_string(),
            message: Some(message),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingPrompt | ServiceError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Generation(_) | ServiceError::ModelLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Builds the response body. With `redact` set, server-side failure details are
    /// left out of the body and only reach the logs.
    pub fn body(&self, redact: bool) -> HttpErrorResponse {
        match self {
            ServiceError::MissingPrompt => HttpErrorResponse::from(MISSING_PROMPT_MESSAGE),
            ServiceError::InvalidRequest(message) => {
                HttpErrorResponse::with_message("Invalid request", message.clone())
            }
            ServiceError::Unauthorized => HttpErrorResponse::from(UNAUTHORIZED_MESSAGE),
            ServiceError::Generation(_) if redact => HttpErrorResponse::from("Generation failed"),
            ServiceError::Generation(message) => {
                HttpErrorResponse::with_message("Generation failed", message.clone())
            }
            ServiceError::ModelLoad(_) if redact => HttpErrorResponse::from("Model load failed"),
            ServiceError::ModelLoad(message) => {
                HttpErrorResponse::with_message("Model load failed", message.clone())
            }
        }
    }

    pub fn into_response_with(self, redact: bool) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let mut res = Json(self.body(redact)).into_response();
        *res.status_mut() = self.status();
        res
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

pub type ServiceResult<T, E = ServiceError> = Result<T, E>;
