//! Robot interface
//!
//! The client loop only needs three things from a robot: a connection, a
//! fixed-length recording and speech output. Backends are chosen by
//! configuration.

mod local;
mod simulated;

use std::time::Duration;

use async_trait::async_trait;

pub use local::LocalRobot;
pub use simulated::SimulatedRobot;

use crate::Result;
use crate::audio::AudioBuffer;
use crate::config::{ClientConfig, RobotBackend};

/// Robot SDK surface used by the client loop
///
/// Futures are not `Send`: audio device handles must stay on the thread
/// driving the loop.
#[async_trait(?Send)]
pub trait Robot {
    /// Connect to the robot at `ip:port`
    async fn connect(&mut self, ip: &str, port: u16) -> Result<()>;

    /// Record from the robot microphone for `duration`
    async fn record_audio(&mut self, duration: Duration) -> Result<AudioBuffer>;

    /// Speak `text` through the robot
    async fn say(&mut self, text: &str) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

#[async_trait(?Send)]
impl<R: Robot + ?Sized> Robot for Box<R> {
    async fn connect(&mut self, ip: &str, port: u16) -> Result<()> {
        (**self).connect(ip, port).await
    }

    async fn record_audio(&mut self, duration: Duration) -> Result<AudioBuffer> {
        (**self).record_audio(duration).await
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        (**self).say(text).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Create the robot backend selected in `config`
///
/// Hardware is only touched on `connect`.
///
/// # Errors
///
/// Returns error if the backend's HTTP client cannot be built
pub fn create(config: &ClientConfig) -> Result<Box<dyn Robot>> {
    let robot: Box<dyn Robot> = match config.robot {
        RobotBackend::Simulated => {
            let robot = SimulatedRobot::new(config.audio);
            match &config.simulated_audio {
                Some(path) => Box::new(robot.with_audio_file(path.clone())),
                None => Box::new(robot),
            }
        }
        RobotBackend::Local => Box::new(LocalRobot::new(&config.speech)?),
    };

    tracing::info!(backend = robot.name(), "robot backend selected");
    Ok(robot)
}
