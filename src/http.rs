//! HTTP utilities for talking to the gateway server
//!
//! Every call is a single attempt with a bounded timeout. Callers decide
//! what a failure means; nothing here retries.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::api::{AudioReply, ChatExchange, ChatRequest};
use crate::config::{AUDIO_ENDPOINT, ClientConfig, HEALTH_ENDPOINT, RESPONSE_ENDPOINT};
use crate::{Error, Result};

/// Compose `http://{host}:{port}{path}`
///
/// No validation is performed. A `path` without a leading slash gets one.
#[must_use]
pub fn build_url(host: &str, port: u16, path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        format!("http://{host}:{port}{path}")
    } else {
        format!("http://{host}:{port}/{path}")
    }
}

/// GET `url` and report whether it answered with a success status
///
/// Network errors and non-2xx statuses both yield `false`.
pub async fn check_health(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            let healthy = response.status().is_success();
            if !healthy {
                tracing::warn!(url, status = %response.status(), "health check failed");
            }
            healthy
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "health check unreachable");
            false
        }
    }
}

/// POST WAV audio to `url` and return the raw response body
///
/// # Errors
///
/// Returns `Transport` on connection failure or a non-2xx response
pub async fn send_audio(client: &Client, url: &str, audio: &[u8]) -> Result<String> {
    tracing::debug!(url, bytes = audio.len(), "sending audio");

    let response = client
        .post(url)
        .header(CONTENT_TYPE, "audio/wav")
        .body(audio.to_vec())
        .send()
        .await
        .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;

    if !status.is_success() {
        tracing::error!(status = %status, body = %body, "server returned error");
        return Err(Error::Transport(format!("server returned {status}: {body}")));
    }

    Ok(body)
}

/// POST a chat message to `url`
///
/// # Errors
///
/// Returns `Transport` on connection failure or a non-2xx response, and
/// `Serialization` if the body is not a chat exchange
pub async fn send_chat(client: &Client, url: &str, text: &str) -> Result<ChatExchange> {
    let response = client
        .post(url)
        .json(&ChatRequest {
            text: text.to_string(),
        })
        .send()
        .await
        .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(Error::Transport(format!("server returned {status}: {body}")));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Extract the reply text from an `/api/audio` response body
///
/// # Errors
///
/// Returns `Serialization` for malformed JSON and `Validation` when the
/// reply is empty
pub fn parse_audio_reply(body: &str) -> Result<String> {
    let reply: AudioReply = serde_json::from_str(body)?;
    let text = reply.reply_text.trim();
    if text.is_empty() {
        return Err(Error::Validation("server reply is empty".to_string()));
    }
    Ok(text.to_string())
}

/// Client for one gateway server
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    health_client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`)
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, timeout: Duration, health_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            health_client: Client::builder().timeout(health_timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from robot client configuration
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.server_url(), config.http_timeout, config.health_timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Whether the server answers its health endpoint
    pub async fn check_health(&self) -> bool {
        check_health(&self.health_client, &self.url(HEALTH_ENDPOINT)).await
    }

    /// Submit audio and return the raw response body
    ///
    /// # Errors
    ///
    /// Returns `Transport` on any network or server failure
    pub async fn send_audio(&self, audio: &[u8]) -> Result<String> {
        send_audio(&self.client, &self.url(AUDIO_ENDPOINT), audio).await
    }

    /// Send a text message to the chat endpoint
    ///
    /// # Errors
    ///
    /// Returns `Transport` on any network or server failure
    pub async fn chat(&self, text: &str) -> Result<ChatExchange> {
        send_chat(&self.client, &self.url(RESPONSE_ENDPOINT), text).await
    }
}
