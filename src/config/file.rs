//! TOML configuration file loading
//!
//! Supports `~/.config/pepper/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PepperConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Model backend configuration
    #[serde(default)]
    pub model: ModelFileConfig,

    /// Robot client configuration
    #[serde(default)]
    pub client: ClientFileConfig,

    /// Robot speech configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Model backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct ModelFileConfig {
    /// Base URL of an OpenAI-compatible API (e.g. "http://localhost:11434/v1")
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Chat model identifier
    pub llm_model: Option<String>,
    /// Transcription model identifier
    pub stt_model: Option<String>,
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub system_prompt: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Robot client configuration
#[derive(Debug, Default, Deserialize)]
pub struct ClientFileConfig {
    pub robot_ip: Option<String>,
    pub robot_port: Option<u16>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    /// Seconds between cycles
    pub interval: Option<f64>,
    pub recording_seconds: Option<u64>,
    pub keyword: Option<String>,
    pub keyword_threshold: Option<f32>,
    /// "simulated" or "local"
    pub robot: Option<String>,
    /// Transcription endpoint used for on-device keyword recognition
    pub recognizer_url: Option<String>,
    /// Transcript returned by the simulated recognizer
    pub simulated_transcript: Option<String>,
    /// WAV file replayed by the simulated robot
    pub simulated_audio: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
}

/// Robot speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// TTS language (e.g. "Japanese")
    pub language: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PepperConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PepperConfigFile {
    config_file_path().map_or_else(PepperConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or invalid files fall back to defaults with a warning.
pub fn load_config_file_from(path: &Path) -> PepperConfigFile {
    if !path.exists() {
        return PepperConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PepperConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PepperConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/pepper/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("pepper").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let fc: PepperConfigFile = toml::from_str(
            r#"
            [server]
            port = 8080

            [client]
            keyword = "robot"
            interval = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(fc.server.port, Some(8080));
        assert!(fc.server.host.is_none());
        assert_eq!(fc.client.keyword.as_deref(), Some("robot"));
        assert_eq!(fc.client.interval, Some(2.5));
        assert!(fc.model.base_url.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file_from(&dir.path().join("absent.toml"));
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn test_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [not toml").unwrap();

        let fc = load_config_file_from(&path);
        assert!(fc.server.port.is_none());
    }
}
