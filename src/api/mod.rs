use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::auth::{auth_middleware, ApiKeys};
use crate::model::ModelSlot;

pub mod auth;
pub mod prompt;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelSlot>,
    pub api_keys: Arc<ApiKeys>,
    pub max_tokens_limit: usize,
    pub redact_errors: bool,
}

pub fn build_router(state: AppState) -> Router {
    // authentication runs before any extractor of the protected handlers
    let protected = Router::new()
        .route("/v1/restart", get(routes::restart))
        .route("/v1/prompt", get(routes::prompt_v1))
        .route("/v2/prompt", post(routes::prompt_v2))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(routes::home))
        .route("/v1/heartbeat", get(routes::heartbeat))
        .route("/v1/capabilities", get(routes::capabilities))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
