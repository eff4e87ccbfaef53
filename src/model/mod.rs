//! Model wrapper
//!
//! Holds the speech-to-text and text-generation capabilities behind two
//! traits. The wrapper is built once at startup and shared read-only by
//! every request handler.

mod chat;
mod whisper;

use std::sync::Arc;

use async_trait::async_trait;

pub use chat::ChatGenerator;
pub use whisper::WhisperStt;

use crate::audio::{ENERGY_THRESHOLD, is_silent};
use crate::config::ModelConfig;
use crate::{Error, Result};

/// Marker separating the user turn from the model's reply
const ASSISTANT_MARKER: &str = "Assistant:";

/// External speech-to-text capability
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe WAV audio to text
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Capability name for logging
    fn name(&self) -> &'static str;
}

/// External text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Capability name for logging
    fn name(&self) -> &'static str;
}

/// Speech-to-text and reply generation behind one handle
#[derive(Clone)]
pub struct ModelWrapper {
    stt: Arc<dyn SpeechToText>,
    generator: Arc<dyn TextGenerator>,
}

impl ModelWrapper {
    /// Wrap existing capabilities
    #[must_use]
    pub fn new(stt: Arc<dyn SpeechToText>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { stt, generator }
    }

    /// Build the OpenAI-compatible backends from configuration
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let stt = WhisperStt::new(
            &config.base_url,
            config.api_key.clone(),
            config.stt_model.clone(),
            config.timeout,
        )?;
        let generator = ChatGenerator::new(config)?;

        tracing::info!(
            base_url = %config.base_url,
            stt_model = %config.stt_model,
            llm_model = %config.llm_model,
            "model wrapper initialized"
        );

        Ok(Self::new(Arc::new(stt), Arc::new(generator)))
    }

    /// Transcribe audio to text
    ///
    /// Silent audio may yield an empty transcript; any other empty result is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty input and `Transcription` when the
    /// capability fails or returns nothing for non-silent audio
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::Validation("empty audio".to_string()));
        }

        tracing::debug!(bytes = audio.len(), stt = self.stt.name(), "transcribing");

        let text = self
            .stt
            .transcribe(audio)
            .await
            .map_err(|e| as_stage_error(e, Error::Transcription))?;
        let text = text.trim();

        if text.is_empty() {
            // Non-WAV input cannot be checked, so it counts as non-silent
            if is_silent(audio, ENERGY_THRESHOLD).unwrap_or(false) {
                tracing::debug!("silent audio, empty transcript");
                return Ok(String::new());
            }
            return Err(Error::Transcription(
                "empty transcript for non-silent audio".to_string(),
            ));
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text.to_string())
    }

    /// Generate a reply to `text`
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank input and `Generation` when the
    /// capability fails or produces an empty reply
    pub async fn generate_reply(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("empty prompt".to_string()));
        }

        let prompt = build_prompt(text);
        tracing::debug!(generator = self.generator.name(), "generating reply");

        let output = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| as_stage_error(e, Error::Generation))?;

        let reply = extract_reply(&output);
        if reply.is_empty() {
            return Err(Error::Generation("model returned an empty reply".to_string()));
        }

        tracing::info!(reply_len = reply.len(), "reply generated");
        Ok(reply)
    }
}

/// Frame user text as a single conversational turn
#[must_use]
pub fn build_prompt(text: &str) -> String {
    format!("User: {text}\n{ASSISTANT_MARKER}")
}

/// Strip any echoed prompt up to the last assistant marker
#[must_use]
pub fn extract_reply(output: &str) -> String {
    output
        .rsplit_once(ASSISTANT_MARKER)
        .map_or(output, |(_, reply)| reply)
        .trim()
        .to_string()
}

/// Keep stage errors as-is, fold everything else into `stage`
fn as_stage_error(error: Error, stage: fn(String) -> Error) -> Error {
    match error {
        Error::Transcription(_) | Error::Generation(_) => error,
        other => stage(other.to_string()),
    }
}
