//! Robot backed by the host's audio devices

use std::time::Duration;

use async_trait::async_trait;

use super::Robot;
use crate::audio::{AudioBuffer, SourceEncoding};
use crate::config::SpeechConfig;
use crate::voice::{AudioCapture, AudioPlayback, TextToSpeech};
use crate::{Error, Result};

/// Host microphone in, synthesized speech out
///
/// Devices are opened on `connect` so that configuration errors surface
/// before the loop starts.
pub struct LocalRobot {
    tts: TextToSpeech,
    language: String,
    capture: Option<AudioCapture>,
    playback: Option<AudioPlayback>,
}

impl LocalRobot {
    /// Create a robot that speaks through the TTS API in `speech`
    ///
    /// # Errors
    ///
    /// Returns error if the TTS client cannot be built
    pub fn new(speech: &SpeechConfig) -> Result<Self> {
        Ok(Self {
            tts: TextToSpeech::new(speech)?,
            language: speech.language.clone(),
            capture: None,
            playback: None,
        })
    }
}

#[async_trait(?Send)]
impl Robot for LocalRobot {
    async fn connect(&mut self, ip: &str, port: u16) -> Result<()> {
        // The robot address is irrelevant when the host stands in for it
        tracing::debug!(ip, port, "opening host audio devices");

        self.capture = Some(AudioCapture::new()?);
        self.playback = Some(AudioPlayback::new()?);

        tracing::info!(language = %self.language, "local robot ready");
        Ok(())
    }

    async fn record_audio(&mut self, duration: Duration) -> Result<AudioBuffer> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| Error::Robot("robot is not connected".to_string()))?;

        let wav = capture.record(duration).await?;
        Ok(AudioBuffer::with_encoding(wav, SourceEncoding::Wav))
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        let playback = self
            .playback
            .as_ref()
            .ok_or_else(|| Error::Robot("robot is not connected".to_string()))?;

        tracing::info!(text, "robot says");
        let audio = self.tts.synthesize(text).await?;
        playback.play_encoded(&audio).await
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
