//! Shared test utilities

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pepper_gateway::api::{self, ApiServer, ApiState};
use pepper_gateway::audio::samples_to_wav;
use pepper_gateway::config::ServerConfig;
use pepper_gateway::model::{ModelWrapper, SpeechToText, TextGenerator};
use pepper_gateway::{Error, Result};
use tokio::net::TcpListener;

/// Speech-to-text with a fixed transcript; `None` fails every call
pub struct MockStt {
    transcript: Option<String>,
    calls: AtomicUsize,
}

impl MockStt {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcript
            .clone()
            .ok_or_else(|| Error::Transcription("speech backend offline".to_string()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Text generator with a fixed reply; `None` fails every call
pub struct MockGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("language model offline".to_string()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Mock capabilities plus the wrapper built from them
pub struct TestModel {
    pub stt: Arc<MockStt>,
    pub generator: Arc<MockGenerator>,
    pub wrapper: ModelWrapper,
}

/// Build a model whose transcriber and generator answer with fixed text
pub fn test_model(transcript: Option<&str>, reply: Option<&str>) -> TestModel {
    let stt = Arc::new(MockStt {
        transcript: transcript.map(ToString::to_string),
        calls: AtomicUsize::new(0),
    });
    let generator = Arc::new(MockGenerator {
        reply: reply.map(ToString::to_string),
        prompts: Mutex::new(Vec::new()),
    });
    let wrapper = ModelWrapper::new(stt.clone(), generator.clone());

    TestModel {
        stt,
        generator,
        wrapper,
    }
}

/// Router over `model`
pub fn test_router(model: &TestModel) -> axum::Router {
    api::router(Arc::new(ApiState::new(model.wrapper.clone())))
}

/// Serve `model` on an ephemeral local port and return the port
pub async fn spawn_server(model: &TestModel) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
    };
    drop(ApiServer::new(&config, model.wrapper.clone()).spawn(listener));

    port
}

/// One second of a loud 16kHz mono tone as WAV
pub fn speech_wav() -> Vec<u8> {
    let samples: Vec<f32> = (0..16000)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16000.0).sin() * 0.3)
        .collect();
    samples_to_wav(&samples, 16000, 1).unwrap()
}

/// One second of silence as WAV
pub fn silent_wav() -> Vec<u8> {
    samples_to_wav(&[0.0; 16000], 16000, 1).unwrap()
}
