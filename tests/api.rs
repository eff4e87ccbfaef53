//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use tower::ServiceExt;

mod common;
use common::{silent_wav, speech_wav, test_model, test_router};

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_audio(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/audio")
        .header(CONTENT_TYPE, "audio/wav")
        .body(Body::from(body))
        .unwrap()
}

fn post_multipart(field: &str, audio: &[u8]) -> Request<Body> {
    let boundary = "pepper-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"audio.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/audio")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let model = test_model(Some("hi"), Some("hello"));
    let app = test_router(&model);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_response_endpoint() {
    let model = test_model(None, Some("Assistant: Hello! How can I help?"));
    let app = test_router(&model);

    let response = app
        .oneshot(post_json("/api/response", r#"{"text":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["input_text"], "hello");
    assert_eq!(json["response_text"], "Hello! How can I help?");
    assert_eq!(model.generator.prompts(), ["User: hello\nAssistant:"]);
    assert_eq!(model.stt.calls(), 0);
}

#[tokio::test]
async fn test_response_missing_text() {
    let model = test_model(None, Some("reply"));

    for body in [r#"{}"#, r#"{"message":"hello"}"#, r#"{"text":5}"#, "not json"] {
        let response = test_router(&model)
            .oneshot(post_json("/api/response", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = json_body(response).await;
        assert!(json["error"].is_string());
    }

    assert_eq!(model.generator.calls(), 0);
}

#[tokio::test]
async fn test_response_blank_text() {
    let model = test_model(None, Some("reply"));
    let app = test_router(&model);

    let response = app
        .oneshot(post_json("/api/response", r#"{"text":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.generator.calls(), 0);
}

#[tokio::test]
async fn test_response_generation_failure() {
    let model = test_model(None, None);
    let app = test_router(&model);

    let response = app
        .oneshot(post_json("/api/response", r#"{"text":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["stage"], "generation");
    assert!(json["error"].as_str().unwrap().contains("offline"));
}

#[tokio::test]
async fn test_audio_empty_body() {
    let model = test_model(Some("hey pepper"), Some("reply"));
    let app = test_router(&model);

    let response = app.oneshot(post_audio(Vec::new())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(model.stt.calls(), 0);
    assert_eq!(model.generator.calls(), 0);
}

#[tokio::test]
async fn test_audio_unparseable_body() {
    let model = test_model(Some("hey pepper"), Some("reply"));
    let app = test_router(&model);

    let response = app
        .oneshot(post_audio(b"definitely not audio".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.stt.calls(), 0);
}

/// Mono 16-bit WAV whose header declares `sample_rate`
fn wav_declaring_rate(sample_rate: u32) -> Vec<u8> {
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&40_u32.to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16_u32.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&sample_rate.wrapping_mul(2).to_le_bytes());
    wav.extend_from_slice(&2_u16.to_le_bytes());
    wav.extend_from_slice(&16_u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&4_u32.to_le_bytes());
    wav.extend_from_slice(&[0; 4]);
    wav
}

#[tokio::test]
async fn test_audio_absurd_sample_rate_is_rejected() {
    let model = test_model(Some("hey pepper"), Some("reply"));

    for rate in [2_147_483_647, 1] {
        let wav = wav_declaring_rate(rate);
        assert_eq!(wav.len(), 48);

        let response = test_router(&model)
            .oneshot(post_audio(wav))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "rate {rate}");
        let json = json_body(response).await;
        assert!(json["error"].is_string());
    }

    assert_eq!(model.stt.calls(), 0);
}

#[tokio::test]
async fn test_audio_round_trip() {
    let model = test_model(Some("hey pepper, how are you?"), Some("I'm fine, thank you."));
    let app = test_router(&model);

    let response = app.oneshot(post_audio(speech_wav())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["reply_text"], "I'm fine, thank you.");
    assert_eq!(json["transcribed_text"], "hey pepper, how are you?");
    assert_eq!(model.stt.calls(), 1);
    assert_eq!(
        model.generator.prompts(),
        ["User: hey pepper, how are you?\nAssistant:"]
    );
}

#[tokio::test]
async fn test_audio_multipart_upload() {
    let model = test_model(Some("pepper"), Some("はい"));
    let app = test_router(&model);

    let response = app
        .oneshot(post_multipart("audio", &speech_wav()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reply_text"], "はい");
}

#[tokio::test]
async fn test_audio_multipart_missing_field() {
    let model = test_model(Some("pepper"), Some("reply"));
    let app = test_router(&model);

    let response = app
        .oneshot(post_multipart("file", &speech_wav()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.stt.calls(), 0);
}

#[tokio::test]
async fn test_audio_transcription_failure() {
    let model = test_model(None, Some("reply"));
    let app = test_router(&model);

    let response = app.oneshot(post_audio(speech_wav())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["stage"], "transcription");
    assert_eq!(model.generator.calls(), 0);
}

#[tokio::test]
async fn test_audio_generation_failure() {
    let model = test_model(Some("hey pepper"), None);
    let app = test_router(&model);

    let response = app.oneshot(post_audio(speech_wav())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["stage"], "generation");
}

#[tokio::test]
async fn test_audio_silence_is_bad_request() {
    let model = test_model(Some(""), Some("reply"));
    let app = test_router(&model);

    let response = app.oneshot(post_audio(silent_wav())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.stt.calls(), 1);
    assert_eq!(model.generator.calls(), 0);
}
