//! Pepper Gateway - speech gateway between a humanoid robot and a language model
//!
//! Two halves share this library:
//! - a server that turns uploaded speech into a generated reply
//! - a robot client that records, listens for a wake word, forwards the
//!   utterance to the server and speaks the answer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │         Robot Client         │  HTTP  │           Server             │
//! │ record → wake word → send ───┼───────►│ /api/audio  /api/response    │
//! │ speak  ◄─────────────────────┼────────┤ transcribe → generate_reply  │
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                │                                       │
//!        Robot (simulated │ local)          OpenAI-compatible STT + LLM
//! ```

pub mod api;
pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod robot;
pub mod voice;

pub use client::{CycleOutcome, PepperClient};
pub use config::Config;
pub use error::{Error, Result};
pub use model::ModelWrapper;
