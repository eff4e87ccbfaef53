//! HTTP API server for the Pepper gateway

pub mod audio;
pub mod chat;
pub mod error;
pub mod health;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use audio::AudioReply;
pub use chat::{ChatExchange, ChatRequest};
pub use error::{ApiError, Stage};
pub use health::HealthResponse;

use crate::Result;
use crate::config::ServerConfig;
use crate::model::ModelWrapper;

/// Largest accepted request body (a few minutes of 16 kHz WAV)
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for API handlers
///
/// Built once at startup; handlers only read it.
pub struct ApiState {
    pub model: ModelWrapper,
}

impl ApiState {
    #[must_use]
    pub fn new(model: ModelWrapper) -> Self {
        Self { model }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(audio::router(state.clone()))
        .merge(chat::router(state))
        .merge(health::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Gateway HTTP server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a server for `config` backed by `model`
    #[must_use]
    pub fn new(config: &ServerConfig, model: ModelWrapper) -> Self {
        Self {
            state: Arc::new(ApiState::new(model)),
            host: config.host.clone(),
            port: config.port,
        }
    }

    /// Router serving this server's state
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl+C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server on {addr}: {e}")))?;

        tracing::info!(host = %self.host, port = self.port, "API server listening");

        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl+C
    ///
    /// # Errors
    ///
    /// Returns error if the server fails while running
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Serve on `listener` in a background task
    #[must_use]
    pub fn spawn(self, listener: TcpListener) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.serve(listener).await })
    }
}

/// Resolve once `signal` fires
///
/// If the signal cannot be listened for, the server keeps running until
/// the process is killed.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl+C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
