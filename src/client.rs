//! Robot client loop
//!
//! One sequential loop: record from the robot, look for the wake word,
//! forward matching audio to the gateway server and speak the reply.
//! A failed cycle is logged and the loop carries on.

use std::sync::Arc;

use crate::audio::{KeywordSpotter, Recognizer, ScriptedRecognizer, SttRecognizer, convert_format};
use crate::config::ClientConfig;
use crate::http::{GatewayClient, parse_audio_reply};
use crate::model::WhisperStt;
use crate::robot::Robot;
use crate::Result;

/// How a single cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The robot could not record, or the recording was unusable
    RecordFailed,
    /// No wake word; nothing was sent
    Discarded,
    /// Health check failed before sending
    ServerUnavailable,
    /// The audio request failed
    TransportFailed,
    /// The server answered with something other than a reply
    InvalidReply,
    /// The reply was spoken
    Spoke,
    /// The reply arrived but the robot could not speak it
    SpeakFailed,
}

/// Build the keyword recognizer selected in `config`
///
/// # Errors
///
/// Returns error if the transcription client cannot be built
pub fn build_recognizer(config: &ClientConfig) -> Result<Arc<dyn Recognizer>> {
    if let Some(url) = &config.recognizer.url {
        let stt = WhisperStt::new(
            url,
            config.recognizer.api_key.clone(),
            config.recognizer.model.clone(),
            config.http_timeout,
        )?;
        tracing::info!(endpoint = stt.endpoint(), "using transcription recognizer");
        return Ok(Arc::new(SttRecognizer::new(Arc::new(stt))));
    }

    if config.recognizer.simulated_transcript.is_none() {
        tracing::warn!("no recognizer configured, every recording will be discarded");
    }

    Ok(Arc::new(ScriptedRecognizer::new(
        config.recognizer.simulated_transcript.clone(),
    )))
}

/// Drives a robot against a gateway server
pub struct PepperClient<R: Robot> {
    robot: R,
    gateway: GatewayClient,
    spotter: KeywordSpotter,
    config: ClientConfig,
}

impl<R: Robot> PepperClient<R> {
    #[must_use]
    pub const fn new(
        robot: R,
        gateway: GatewayClient,
        spotter: KeywordSpotter,
        config: ClientConfig,
    ) -> Self {
        Self {
            robot,
            gateway,
            spotter,
            config,
        }
    }

    /// Create a client with the gateway and recognizer from `config`
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(robot: R, config: ClientConfig) -> Result<Self> {
        let gateway = GatewayClient::from_config(&config)?;
        let spotter = KeywordSpotter::new(
            &config.keyword,
            config.keyword_threshold,
            build_recognizer(&config)?,
        );
        Ok(Self::new(robot, gateway, spotter, config))
    }

    #[must_use]
    pub const fn robot(&self) -> &R {
        &self.robot
    }

    /// Connect to the configured robot
    ///
    /// # Errors
    ///
    /// Returns error if the robot is unreachable
    pub async fn connect(&mut self) -> Result<()> {
        tracing::info!(
            ip = %self.config.robot_ip,
            port = self.config.robot_port,
            robot = self.robot.name(),
            "connecting to robot"
        );
        self.robot
            .connect(&self.config.robot_ip, self.config.robot_port)
            .await
    }

    /// Run one record, detect, send, speak cycle
    ///
    /// Never fails; every error is logged and reported as the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let recording = match self.robot.record_audio(self.config.recording).await {
            Ok(recording) => recording,
            Err(e) => {
                tracing::error!(error = %e, "recording failed");
                return CycleOutcome::RecordFailed;
            }
        };

        let wav = match convert_format(&recording, &self.config.audio) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!(error = %e, bytes = recording.len(), "unusable recording");
                return CycleOutcome::RecordFailed;
            }
        };

        if !self.spotter.detect(&wav).await {
            tracing::debug!("no wake word, discarding recording");
            return CycleOutcome::Discarded;
        }

        if !self.gateway.check_health().await {
            tracing::error!(server = self.gateway.base_url(), "server unavailable");
            let phrase = self.config.phrases.server_unavailable.clone();
            self.speak(&phrase).await;
            return CycleOutcome::ServerUnavailable;
        }

        let body = match self.gateway.send_audio(&wav).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to send audio");
                let phrase = self.config.phrases.no_response.clone();
                self.speak(&phrase).await;
                return CycleOutcome::TransportFailed;
            }
        };

        let reply = match parse_audio_reply(&body) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "invalid server reply");
                let phrase = self.config.phrases.bad_response.clone();
                self.speak(&phrase).await;
                return CycleOutcome::InvalidReply;
            }
        };

        tracing::info!(reply = %reply, "server replied");

        if self.speak(&reply).await {
            CycleOutcome::Spoke
        } else {
            CycleOutcome::SpeakFailed
        }
    }

    /// Connect and loop until Ctrl+C (or once, if so configured)
    ///
    /// # Errors
    ///
    /// Returns error only if the robot connection fails
    pub async fn run(&mut self) -> Result<()> {
        self.connect().await?;

        let ready = self.config.phrases.ready.clone();
        self.speak(&ready).await;

        if self.config.once {
            let outcome = self.run_cycle().await;
            tracing::info!(?outcome, "single cycle complete");
            return Ok(());
        }

        tracing::info!(
            keyword = self.spotter.keyword(),
            interval = ?self.config.interval,
            "listening for wake word"
        );

        loop {
            tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => break,
                outcome = self.run_cycle() => {
                    tracing::debug!(?outcome, "cycle complete");
                }
            }

            tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => break,
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }

        tracing::info!("shutdown requested");
        let farewell = self.config.phrases.farewell.clone();
        self.speak(&farewell).await;

        Ok(())
    }

    /// Speak through the robot, logging failures
    async fn speak(&mut self, text: &str) -> bool {
        match self.robot.say(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "robot speech failed");
                false
            }
        }
    }
}
