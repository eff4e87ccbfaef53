//! Text chat endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::{ApiError, Stage};
use crate::config::RESPONSE_ENDPOINT;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(RESPONSE_ENDPOINT, post(process_chat))
        .with_state(state)
}

/// Chat request body
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub input_text: String,
    pub response_text: String,
}

/// Generate a reply to text input, bypassing audio
async fn process_chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatExchange>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!(error = %e, "invalid chat request");
        ApiError::BadRequest(e.body_text())
    })?;

    tracing::info!(input = %request.text, "received chat input");

    let response_text = state
        .model
        .generate_reply(&request.text)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "chat generation failed");
            ApiError::from_stage(Stage::Generation, e)
        })?;

    Ok(Json(ChatExchange {
        input_text: request.text,
        response_text,
    }))
}
