//! Text-to-speech via an OpenAI-compatible speech API

use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    voice: String,
    speed: f32,
    model: String,
}

#[derive(serde::Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

impl TextToSpeech {
    /// Create a synthesizer from speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/audio/speech", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
            model: config.tts_model.clone(),
        })
    }

    /// Full speech endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Synthesize text to encoded audio (MP3)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_endpoint_and_request_shape() {
        let mut speech = Config::default().client.speech;
        speech.base_url = "http://localhost:8000/v1/".to_string();
        let tts = TextToSpeech::new(&speech).unwrap();

        assert_eq!(tts.endpoint(), "http://localhost:8000/v1/audio/speech");

        let json = serde_json::to_value(TtsRequest {
            model: &tts.model,
            input: "こんにちは",
            voice: &tts.voice,
            speed: tts.speed,
        })
        .unwrap();
        assert_eq!(json["model"], "tts-1");
        assert_eq!(json["voice"], "alloy");
        assert_eq!(json["input"], "こんにちは");
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        // Accepts connections into the backlog but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut speech = Config::default().client.speech;
        speech.base_url = format!("http://127.0.0.1:{port}/v1");
        speech.timeout = std::time::Duration::from_millis(200);
        let tts = TextToSpeech::new(&speech).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            tts.synthesize("こんにちは"),
        )
        .await
        .expect("synthesis should give up on its own");

        assert!(matches!(result, Err(Error::Http(_))));
        drop(listener);
    }
}
