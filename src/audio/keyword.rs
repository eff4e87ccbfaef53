//! Wake word detection
//!
//! Decides whether a recorded buffer should be forwarded to the server.
//! Uses a two-stage approach: a local energy gate drops silent buffers,
//! then a recognizer transcript is searched for the keyword.

use std::sync::Arc;

use super::convert::{decode_wav, rms_energy};
use super::recognizer::Recognizer;

/// Minimum audio energy to consider speech
pub const ENERGY_THRESHOLD: f32 = 0.01;

/// One candidate transcript from a recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,

    /// Recognizer confidence in `[0, 1]`, when reported
    pub confidence: Option<f32>,
}

impl Alternative {
    /// Alternative without a confidence score
    #[must_use]
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            confidence: None,
        }
    }

    /// Alternative with a confidence score
    #[must_use]
    pub fn with_confidence(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            confidence: Some(confidence),
        }
    }
}

/// Recognizer output: zero or more candidate transcripts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    pub alternatives: Vec<Alternative>,
}

impl Recognition {
    /// Single-transcript recognition; empty text yields no alternatives
    #[must_use]
    pub fn from_transcript(transcript: &str) -> Self {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Self::default();
        }
        Self {
            alternatives: vec![Alternative::new(transcript)],
        }
    }

    /// Whether any alternative contains `keyword` with enough confidence
    ///
    /// Alternatives without a confidence score are accepted on text alone.
    #[must_use]
    pub fn matches(&self, keyword: &str, threshold: f32) -> bool {
        self.alternatives.iter().any(|alt| {
            detect_keyword(&alt.transcript, keyword)
                && alt.confidence.is_none_or(|c| c >= threshold)
        })
    }
}

/// Case-insensitive check for `keyword` inside `text`
///
/// An empty keyword never matches.
#[must_use]
pub fn detect_keyword(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    text.to_lowercase().contains(&keyword)
}

/// Gates recorded audio on the presence of a wake word
pub struct KeywordSpotter {
    keyword: String,
    threshold: f32,
    energy_threshold: f32,
    recognizer: Arc<dyn Recognizer>,
}

impl KeywordSpotter {
    /// Create a spotter for `keyword` backed by `recognizer`
    #[must_use]
    pub fn new(keyword: &str, threshold: f32, recognizer: Arc<dyn Recognizer>) -> Self {
        let keyword = keyword.trim().to_lowercase();
        tracing::debug!(
            keyword,
            threshold,
            recognizer = recognizer.name(),
            "keyword spotter initialized"
        );

        Self {
            keyword,
            threshold,
            energy_threshold: ENERGY_THRESHOLD,
            recognizer,
        }
    }

    /// Override the silence gate
    #[must_use]
    pub const fn energy_threshold(mut self, threshold: f32) -> Self {
        self.energy_threshold = threshold;
        self
    }

    /// Run detection over WAV audio
    ///
    /// Silence, undecodable audio, recognizer failures and transcripts
    /// without the keyword all yield `false`.
    pub async fn detect(&self, wav: &[u8]) -> bool {
        let energy = match decode_wav(wav) {
            Ok((samples, _)) => rms_energy(&samples),
            Err(e) => {
                tracing::warn!(error = %e, "cannot inspect audio for keyword");
                return false;
            }
        };

        if energy < self.energy_threshold {
            tracing::debug!(energy, "no speech energy, skipping recognition");
            return false;
        }

        let recognition = match self.recognizer.recognize(wav).await {
            Ok(recognition) => recognition,
            Err(e) => {
                tracing::warn!(error = %e, recognizer = self.recognizer.name(), "recognition failed");
                return false;
            }
        };

        tracing::trace!(?recognition, "recognized");

        let found = recognition.matches(&self.keyword, self.threshold);
        if found {
            tracing::info!(keyword = %self.keyword, "wake word detected");
        }
        found
    }

    /// The normalized keyword
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}
