//! OpenAI-compatible speaker against an in-process mock upstream.

use std::sync::{Arc, Mutex};

use arena_server::config::{ArenaConfig, SpeakerEndpoint};
use arena_server::speakers::{OpenAiSpeaker, OpenAiSpeakerFactory, SpeakerFactory};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use futures::TryStreamExt;
use orchestration::debate::DebateRole;
use orchestration::{Chunk, Speaker, SpeakerContext, SpeakerError};
use serde_json::Value;

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

const STREAM_BODY: &str = concat!(
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Use \"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"flywheels.\"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

/// A provider that drops `choices` mid-stream (e.g. a moderation notice).
const CHOICELESS_BODY: &str = concat!(
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Use \"}}]}\n\n",
    "data: {\"id\":\"cmpl-1\",\"object\":\"chat.completion.chunk\"}\n\n",
    "data: [DONE]\n\n",
);

async fn completions(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let model = body["model"].as_str().unwrap_or_default().to_string();
    captured.requests.lock().unwrap().push((auth, body));

    if model == "broken-model" {
        return (
            StatusCode::PAYMENT_REQUIRED,
            [("content-type", "application/json")],
            r#"{"error":{"message":"Insufficient Balance"}}"#.to_string(),
        );
    }
    if model == "choiceless-model" {
        return (
            StatusCode::OK,
            [("content-type", "text/event-stream")],
            CHOICELESS_BODY.to_string(),
        );
    }
    if model == "garbled-model" {
        return (
            StatusCode::OK,
            [("content-type", "text/event-stream")],
            "data: {\"object\":\"error\"}\n\n".to_string(),
        );
    }
    (
        StatusCode::OK,
        [("content-type", "text/event-stream")],
        STREAM_BODY.to_string(),
    )
}

/// Spawn the mock upstream; returns its base URL.
async fn mock_upstream(captured: Captured) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(captured);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}/v1", addr)
}

fn endpoint(url: &str, model: &str, api_key_env: Option<&str>) -> SpeakerEndpoint {
    SpeakerEndpoint {
        url: url.to_string(),
        model: model.to_string(),
        api_key_env: api_key_env.map(str::to_string),
        temperature: None,
    }
}

#[tokio::test]
async fn test_streams_text_fragments() {
    let captured = Captured::default();
    let url = mock_upstream(captured.clone()).await;
    std::env::set_var("ARENA_TEST_UPSTREAM_KEY", "sk-test");
    let speaker = OpenAiSpeaker::new(
        reqwest::Client::new(),
        endpoint(&url, "deepseek-chat", Some("ARENA_TEST_UPSTREAM_KEY")),
        "deepseek",
    );

    let chunks: Vec<Chunk> = speaker
        .generate(&SpeakerContext::proposal("renewable energy storage"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(
        chunks,
        vec![Chunk::Text("Use ".into()), Chunk::Text("flywheels.".into())]
    );

    let requests = captured.requests.lock().unwrap();
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "deepseek-chat");
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("renewable energy storage"));
}

#[tokio::test]
async fn test_upstream_error_status() {
    let url = mock_upstream(Captured::default()).await;
    let speaker = OpenAiSpeaker::new(
        reqwest::Client::new(),
        endpoint(&url, "broken-model", None),
        "broke",
    );
    let err = match speaker
        .generate(&SpeakerContext::Challenge {
            proposal: "p".into(),
        })
        .await
    {
        Ok(_) => panic!("expected upstream error"),
        Err(err) => err,
    };
    assert_eq!(
        err,
        SpeakerError::Upstream {
            status: 402,
            body: "Insufficient Balance".into()
        }
    );
}

#[tokio::test]
async fn test_garbled_chunk_is_malformed() {
    let url = mock_upstream(Captured::default()).await;
    let speaker = OpenAiSpeaker::new(
        reqwest::Client::new(),
        endpoint(&url, "garbled-model", None),
        "garbled",
    );
    let chunks: Vec<Chunk> = speaker
        .generate(&SpeakerContext::proposal("t"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert!(matches!(chunks.as_slice(), [Chunk::Malformed(_)]));
}

#[tokio::test]
async fn test_choiceless_chunk_after_text_is_surfaced() {
    let url = mock_upstream(Captured::default()).await;
    let speaker = OpenAiSpeaker::new(
        reqwest::Client::new(),
        endpoint(&url, "choiceless-model", None),
        "choiceless",
    );
    let chunks: Vec<Chunk> = speaker
        .generate(&SpeakerContext::proposal("t"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], Chunk::Text("Use ".into()));
    match &chunks[1] {
        Chunk::Malformed(raw) => assert!(raw.contains("cmpl-1")),
        other => panic!("expected malformed chunk, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Port 9 (discard) is closed on test hosts.
    let speaker = OpenAiSpeaker::new(
        reqwest::Client::new(),
        endpoint("http://127.0.0.1:9/v1", "m", None),
        "nowhere",
    );
    let result = speaker.generate(&SpeakerContext::proposal("t")).await;
    assert!(matches!(result, Err(SpeakerError::RequestFailed(_))));
}

#[tokio::test]
async fn test_catalog_file_routes_labels() {
    let captured = Captured::default();
    let url = mock_upstream(captured.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speakers.toml");
    std::fs::write(
        &path,
        format!(
            "[speakers.local]\nurl = \"{}\"\nmodel = \"local-model\"\ntemperature = 0.1\n",
            url
        ),
    )
    .unwrap();

    let config = ArenaConfig {
        speakers_file: Some(path),
        ..ArenaConfig::default()
    };
    let factory = OpenAiSpeakerFactory::from_config(&config).unwrap();
    assert_eq!(factory.endpoint_for("unlisted").model, "deepseek-chat");

    let speaker = factory.build(DebateRole::Arbitrator, "local");
    let chunks: Vec<Chunk> = speaker
        .generate(&SpeakerContext::Judgement {
            proposal: "p".into(),
            challenge: "c".into(),
        })
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.len(), 2);

    let requests = captured.requests.lock().unwrap();
    let (_, body) = &requests[0];
    assert_eq!(body["model"], "local-model");
    assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
}

#[test]
fn test_missing_catalog_file_is_an_error() {
    let config = ArenaConfig {
        speakers_file: Some("/nonexistent/speakers.toml".into()),
        ..ArenaConfig::default()
    };
    assert!(OpenAiSpeakerFactory::from_config(&config).is_err());
}
