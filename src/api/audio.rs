//! Audio submission endpoint
//!
//! Accepts raw audio bytes (or a multipart form with an `audio` field),
//! transcribes them and answers with a generated reply.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::{ApiError, Stage};
use crate::audio::{AudioBuffer, AudioSpec, convert_format};
use crate::config::AUDIO_ENDPOINT;

/// Multipart field carrying the audio file
const AUDIO_FIELD: &str = "audio";

/// Build audio router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(AUDIO_ENDPOINT, post(process_audio))
        .with_state(state)
}

/// Reply to a submitted utterance
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioReply {
    #[serde(alias = "response_text")]
    pub reply_text: String,

    #[serde(default)]
    pub transcribed_text: String,
}

/// Transcribe submitted audio and generate a reply
async fn process_audio(
    State(state): State<Arc<ApiState>>,
    request: Request,
) -> Result<Json<AudioReply>, ApiError> {
    let body = read_audio(request).await?;

    if body.is_empty() {
        tracing::warn!("empty audio body");
        return Err(ApiError::BadRequest("No audio data provided".to_string()));
    }

    let wav = convert_format(&AudioBuffer::new(body.to_vec()), &AudioSpec::default())
        .map_err(|e| {
            tracing::warn!(error = %e, "unparseable audio body");
            ApiError::BadRequest(e.to_string())
        })?;

    let transcribed_text = state.model.transcribe(&wav).await.map_err(|e| {
        tracing::error!(error = %e, "transcription failed");
        ApiError::from_stage(Stage::Transcription, e)
    })?;

    if transcribed_text.is_empty() {
        return Err(ApiError::BadRequest("No speech detected in audio".to_string()));
    }

    let reply_text = state
        .model
        .generate_reply(&transcribed_text)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "reply generation failed");
            ApiError::from_stage(Stage::Generation, e)
        })?;

    Ok(Json(AudioReply {
        reply_text,
        transcribed_text,
    }))
}

/// Read the audio payload from a raw or multipart body
async fn read_audio(request: Request) -> Result<Bytes, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()));
        }
    }

    tracing::warn!("no audio field in multipart request");
    Err(ApiError::BadRequest("No audio file provided".to_string()))
}
