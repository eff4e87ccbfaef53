//! Robot without hardware
//!
//! Speech is logged and recorded instead of spoken. Recordings are a test
//! tone or the contents of a WAV file.

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::Robot;
use crate::audio::{AudioBuffer, AudioSpec, SourceEncoding, load_audio_from_file};
use crate::{Error, Result};

/// Frequency of the synthesized tone
const TONE_HZ: f32 = 440.0;

/// Peak amplitude of the synthesized tone
const TONE_AMPLITUDE: f32 = 0.3;

/// Simulated robot
pub struct SimulatedRobot {
    spec: AudioSpec,
    audio_file: Option<PathBuf>,
    realtime: bool,
    connected: Option<String>,
    spoken: Vec<String>,
}

impl SimulatedRobot {
    /// Robot producing tone recordings in `spec`
    #[must_use]
    pub const fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            audio_file: None,
            realtime: true,
            connected: None,
            spoken: Vec::new(),
        }
    }

    /// Replay `path` as every recording
    #[must_use]
    pub fn with_audio_file(mut self, path: PathBuf) -> Self {
        self.audio_file = Some(path);
        self
    }

    /// Return recordings immediately instead of waiting out their duration
    #[must_use]
    pub const fn instant(mut self) -> Self {
        self.realtime = false;
        self
    }

    /// Everything said so far, oldest first
    #[must_use]
    pub fn spoken(&self) -> &[String] {
        &self.spoken
    }

    /// Address passed to the last successful `connect`
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.connected.as_deref()
    }

    fn tone(&self, duration: Duration) -> AudioBuffer {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let frames = (duration.as_secs_f64() * f64::from(self.spec.sample_rate)) as usize;
        let channels = usize::from(self.spec.channels.max(1));
        #[allow(clippy::cast_precision_loss)]
        let rate = self.spec.sample_rate as f32;

        let mut data = Vec::with_capacity(frames * channels * 2);
        for i in 0..frames {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / rate;
            #[allow(clippy::cast_possible_truncation)]
            let sample = ((TAU * TONE_HZ * t).sin() * TONE_AMPLITUDE * 32767.0) as i16;
            for _ in 0..channels {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }

        AudioBuffer::with_encoding(
            data,
            SourceEncoding::Pcm16 {
                sample_rate: self.spec.sample_rate,
                channels: self.spec.channels.max(1),
            },
        )
    }
}

#[async_trait(?Send)]
impl Robot for SimulatedRobot {
    async fn connect(&mut self, ip: &str, port: u16) -> Result<()> {
        let address = format!("{ip}:{port}");
        tracing::info!(address = %address, "simulated robot connected");
        self.connected = Some(address);
        Ok(())
    }

    async fn record_audio(&mut self, duration: Duration) -> Result<AudioBuffer> {
        if self.connected.is_none() {
            return Err(Error::Robot("robot is not connected".to_string()));
        }

        tracing::debug!(duration = ?duration, "simulated recording");
        if self.realtime {
            tokio::time::sleep(duration).await;
        }

        match &self.audio_file {
            Some(path) => Ok(AudioBuffer::new(load_audio_from_file(path)?)),
            None => Ok(self.tone(duration)),
        }
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        tracing::info!(text, "robot says");
        self.spoken.push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
