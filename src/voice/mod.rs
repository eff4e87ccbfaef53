//! Host audio devices and speech synthesis
//!
//! Backs the `local` robot: the host microphone stands in for the robot's
//! and synthesized speech plays through the host speakers.

mod capture;
mod playback;
mod tts;

pub use capture::AudioCapture;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use tts::TextToSpeech;
