use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use orchestration::events::KEEPALIVE_TEXT;
use orchestration::{DebateOrchestrator, DebateRequest, EventEmitter, WireFrame};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ArenaConfig;
use crate::roles;
use crate::sessions::{ContinueError, SessionRegistry};
use crate::speakers::SpeakerFactory;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: ArenaConfig,
    pub sessions: SessionRegistry,
    pub speakers: Arc<dyn SpeakerFactory>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ArenaConfig, speakers: Arc<dyn SpeakerFactory>) -> Self {
        Self {
            config,
            sessions: SessionRegistry::new(),
            speakers,
        }
    }
}

// ── Request / response payloads ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ContinueRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContinueResponse {
    pub status: String,
    pub message: String,
    pub session_id: String,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(json!({"status": "error", "message": message}))).into_response()
    }
}

impl From<ContinueError> for ApiError {
    fn from(err: ContinueError) -> Self {
        let message = err.to_string();
        match err {
            ContinueError::Ambiguous(_) => ApiError::BadRequest(message),
            ContinueError::NoOpenSession | ContinueError::UnknownSession(_) => {
                ApiError::NotFound(message)
            }
            ContinueError::NotPaused(_) => ApiError::Conflict(message),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/", get(banner))
        .route("/test", get(liveness))
        .route("/debate", get(debate_stream))
        .route("/debate/continue", post(continue_debate))
        .route("/{role}/invoke", post(roles::invoke))
        .route("/{role}/stream", post(roles::stream_role))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin, "invalid CORS origin; cross-origin requests will be refused");
            layer
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn banner() -> impl IntoResponse {
    Json(json!({
        "message": "Debate arena API",
        "endpoints": {
            "GET /debate": "stream a debate (topic, proposer, challenger, arbitrator, rounds)",
            "POST /debate/continue": "resume a paused debate",
            "POST /{role}/invoke": "one reply from proposer, challenger, or arbitrator",
            "POST /{role}/stream": "the same reply streamed as SSE",
            "GET /test": "liveness probe",
        }
    }))
}

async fn liveness() -> impl IntoResponse {
    Json(json!({"message": "API is working"}))
}

/// Open one debate stream.
///
/// The orchestrator runs in its own task and writes into the emitter; this
/// handler only forwards frames. When the client goes away the receiver is
/// dropped, which the orchestrator observes as a disconnect.
async fn debate_stream(
    State(state): State<SharedState>,
    Query(request): Query<DebateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (gate, guard) = state.sessions.register(&session_id);
    let speakers = state.speakers.speaker_set(&request);
    let (mut emitter, frames) = EventEmitter::channel(&session_id);
    let orchestrator = DebateOrchestrator::new(&session_id, request, speakers, gate)
        .with_pacing(state.config.pacing);

    info!(session_id = %session_id, open_sessions = state.sessions.len(), "debate stream opened");
    tokio::spawn(async move {
        let _guard = guard;
        orchestrator.run(&mut emitter).await
    });

    let events = stream::unfold(frames, |mut frames| async move {
        let frame = frames.recv().await?;
        Some((Ok(sse_event(&frame)), frames))
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.keepalive)
            .text(KEEPALIVE_TEXT),
    )
}

fn sse_event(frame: &WireFrame) -> Event {
    let event = match frame.event_name() {
        Some(name) => Event::default().event(name),
        None => Event::default(),
    };
    event.data(frame.data())
}

async fn continue_debate(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ContinueResponse>, ApiError> {
    let request: ContinueRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ContinueRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid continue request: {}", e)))?
    };

    let session_id = state.sessions.release(request.session_id.as_deref())?;
    Ok(Json(ContinueResponse {
        status: "success".to_string(),
        message: "continue signal received".to_string(),
        session_id,
    }))
}
