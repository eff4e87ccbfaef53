//! On-device speech recognizers used for wake word detection

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::keyword::Recognition;
use crate::Result;
use crate::model::SpeechToText;

/// Produces candidate transcripts for a short WAV snippet
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize speech in WAV audio
    async fn recognize(&self, wav: &[u8]) -> Result<Recognition>;

    /// Recognizer name for logging
    fn name(&self) -> &'static str;
}

/// Recognizer backed by any speech-to-text capability
pub struct SttRecognizer {
    stt: Arc<dyn SpeechToText>,
}

impl SttRecognizer {
    #[must_use]
    pub fn new(stt: Arc<dyn SpeechToText>) -> Self {
        Self { stt }
    }
}

#[async_trait]
impl Recognizer for SttRecognizer {
    async fn recognize(&self, wav: &[u8]) -> Result<Recognition> {
        let transcript = self.stt.transcribe(wav).await?;
        Ok(Recognition::from_transcript(&transcript))
    }

    fn name(&self) -> &'static str {
        "stt"
    }
}

/// Recognizer that always hears the same transcript
///
/// Pairs with the simulated robot when no recognition service is available.
pub struct ScriptedRecognizer {
    transcript: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    #[must_use]
    pub const fn new(transcript: Option<String>) -> Self {
        Self {
            transcript,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of recognitions performed
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, _wav: &[u8]) -> Result<Recognition> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .transcript
            .as_deref()
            .map(Recognition::from_transcript)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
