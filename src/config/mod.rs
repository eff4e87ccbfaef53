//! Configuration management for the Pepper gateway
//!
//! Values are layered: built-in defaults, then the TOML file
//! (see [`file`]), then environment variables. CLI flags are applied on
//! top by the binary before anything is started.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioSpec;
use file::PepperConfigFile;

/// Default server bind host
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default robot address
pub const DEFAULT_ROBOT_IP: &str = "127.0.0.1";

/// Default NAOqi port
pub const DEFAULT_ROBOT_PORT: u16 = 9559;

/// Health check path
pub const HEALTH_ENDPOINT: &str = "/health";

/// Audio submission path
pub const AUDIO_ENDPOINT: &str = "/api/audio";

/// Text chat path
pub const RESPONSE_ENDPOINT: &str = "/api/response";

/// Default wake word
pub const DEFAULT_KEYWORD: &str = "pepper";

/// Minimum recognizer confidence for a keyword match
pub const DEFAULT_KEYWORD_THRESHOLD: f32 = 0.5;

/// Length of each robot recording
pub const DEFAULT_RECORDING_SECS: u64 = 5;

/// Default OpenAI-compatible API base URL
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Maximum tokens generated per reply
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 100;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Full gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Model backend settings (server side)
    pub model: ModelConfig,

    /// Robot client settings
    pub client: ClientConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

/// Model backend configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,

    /// API key (from `PEPPER_MODEL_API_KEY` or `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Chat model identifier
    pub llm_model: String,

    /// Transcription model identifier
    pub stt_model: String,

    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,

    /// Optional system prompt prepended to every conversation
    pub system_prompt: Option<String>,

    /// Upper bound on a single model call
    pub timeout: Duration,
}

/// Which robot implementation the client drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RobotBackend {
    /// No hardware; speech is logged and audio is synthesized
    #[default]
    Simulated,
    /// Host microphone and speakers
    Local,
}

impl std::str::FromStr for RobotBackend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" | "mock" => Ok(Self::Simulated),
            "local" => Ok(Self::Local),
            other => Err(crate::Error::Config(format!("unknown robot backend: {other}"))),
        }
    }
}

/// Keyword recognizer configuration (client side)
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Transcription endpoint (OpenAI-compatible `.../audio/transcriptions`)
    pub url: Option<String>,

    /// Transcription model
    pub model: String,

    pub api_key: Option<String>,

    /// Fixed transcript for the simulated recognizer
    pub simulated_transcript: Option<String>,
}

/// Robot text-to-speech configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speech language requested from the robot
    pub language: String,

    /// Base URL of the TTS API (local robot backend)
    pub base_url: String,

    pub api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,

    /// Timeout for synthesis requests
    pub timeout: Duration,
}

/// Fixed phrases the robot speaks outside of model replies
#[derive(Debug, Clone)]
pub struct Phrases {
    pub ready: String,
    pub farewell: String,
    pub server_unavailable: String,
    pub no_response: String,
    pub bad_response: String,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            ready: "準備ができました。「pepper」と呼びかけてください。".to_string(),
            farewell: "終了します。".to_string(),
            server_unavailable: "サーバーに接続できません。".to_string(),
            no_response: "サーバーからの応答がありません。".to_string(),
            bad_response: "応答の処理中にエラーが発生しました。".to_string(),
        }
    }
}

/// Robot client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub robot_ip: String,
    pub robot_port: u16,
    pub server_host: String,
    pub server_port: u16,

    /// Run a single cycle and exit
    pub once: bool,

    /// Pause between cycles
    pub interval: Duration,

    /// Length of each recording
    pub recording: Duration,

    pub keyword: String,
    pub keyword_threshold: f32,

    /// Encoding expected by the transcription capability
    pub audio: AudioSpec,

    pub robot: RobotBackend,
    pub recognizer: RecognizerConfig,
    pub speech: SpeechConfig,

    /// WAV file replayed by the simulated robot instead of a test tone
    pub simulated_audio: Option<PathBuf>,

    /// Timeout for audio submission
    pub http_timeout: Duration,

    /// Timeout for health checks
    pub health_timeout: Duration,

    pub phrases: Phrases,
}

impl ClientConfig {
    /// Base URL of the gateway server
    #[must_use]
    pub fn server_url(&self) -> String {
        crate::http::build_url(&self.server_host, self.server_port, "")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_sources(PepperConfigFile::default(), |_| None)
    }
}

impl Config {
    /// Load configuration from the config file and the process environment
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn from_sources(fc: PepperConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let parse_env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: parse_env("PEPPER_SERVER_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            port: parse_env("PEPPER_SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_SERVER_PORT),
        };

        let api_key = parse_env("PEPPER_MODEL_API_KEY")
            .or_else(|| parse_env("OPENAI_API_KEY"))
            .or(fc.model.api_key);
        let base_url = parse_env("PEPPER_MODEL_BASE_URL")
            .or(fc.model.base_url)
            .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());
        let stt_model = parse_env("PEPPER_STT_MODEL")
            .or(fc.model.stt_model)
            .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string());

        let model = ModelConfig {
            base_url: base_url.clone(),
            api_key: api_key.clone(),
            llm_model: parse_env("PEPPER_LLM_MODEL")
                .or(fc.model.llm_model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            stt_model: stt_model.clone(),
            max_new_tokens: fc.model.max_new_tokens.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
            temperature: fc.model.temperature.unwrap_or(0.7),
            top_p: fc.model.top_p.unwrap_or(0.9),
            system_prompt: fc.model.system_prompt,
            timeout: Duration::from_secs(
                fc.model.timeout_secs.unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            ),
        };

        let robot = parse_env("PEPPER_ROBOT")
            .or(fc.client.robot)
            .and_then(|r| {
                r.parse()
                    .map_err(|e| tracing::warn!(error = %e, "ignoring robot backend"))
                    .ok()
            })
            .unwrap_or_default();

        let http_timeout_secs = parse_env("PEPPER_HTTP_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .or(fc.client.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let client = ClientConfig {
            robot_ip: parse_env("PEPPER_ROBOT_IP")
                .or(fc.client.robot_ip)
                .unwrap_or_else(|| DEFAULT_ROBOT_IP.to_string()),
            robot_port: parse_env("PEPPER_ROBOT_PORT")
                .and_then(|p| p.parse().ok())
                .or(fc.client.robot_port)
                .unwrap_or(DEFAULT_ROBOT_PORT),
            server_host: fc.client.server_host.unwrap_or_else(|| "localhost".to_string()),
            server_port: fc.client.server_port.unwrap_or(DEFAULT_SERVER_PORT),
            once: false,
            interval: fc.client.interval.map_or(DEFAULT_INTERVAL, |secs| {
                Duration::try_from_secs_f64(secs).unwrap_or_else(|e| {
                    tracing::warn!(interval = secs, error = %e, "invalid interval, using default");
                    DEFAULT_INTERVAL
                })
            }),
            recording: Duration::from_secs(
                fc.client.recording_seconds.unwrap_or(DEFAULT_RECORDING_SECS),
            ),
            keyword: parse_env("PEPPER_KEYWORD")
                .or(fc.client.keyword)
                .unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
            keyword_threshold: fc
                .client
                .keyword_threshold
                .unwrap_or(DEFAULT_KEYWORD_THRESHOLD),
            audio: AudioSpec::default(),
            robot,
            recognizer: RecognizerConfig {
                url: parse_env("PEPPER_RECOGNIZER_URL").or(fc.client.recognizer_url),
                model: stt_model,
                api_key: api_key.clone(),
                simulated_transcript: fc.client.simulated_transcript,
            },
            speech: SpeechConfig {
                language: fc.speech.language.unwrap_or_else(|| "Japanese".to_string()),
                base_url,
                api_key,
                tts_model: parse_env("PEPPER_TTS_MODEL")
                    .or(fc.speech.tts_model)
                    .unwrap_or_else(|| "tts-1".to_string()),
                tts_voice: parse_env("PEPPER_TTS_VOICE")
                    .or(fc.speech.tts_voice)
                    .unwrap_or_else(|| "alloy".to_string()),
                tts_speed: fc.speech.tts_speed.unwrap_or(1.0),
                timeout: Duration::from_secs(http_timeout_secs),
            },
            simulated_audio: fc.client.simulated_audio,
            http_timeout: Duration::from_secs(http_timeout_secs),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            phrases: Phrases::default(),
        };

        Self {
            server,
            model,
            client,
        }
    }
}
