//! Direct calls to a single role, outside any debate session.
//!
//! `POST /{role}/invoke` answers with the whole reply; `POST /{role}/stream`
//! streams it as `event: data` frames (JSON-encoded text) and finishes with
//! `event: end`. The body is `{"input": {...}, "label": "..."}`, where `input`
//! holds `topic` for the proposer, `proposal` for the challenger, and
//! `proposal` plus `challenge` for the arbitrator. Without a label the default
//! endpoint is used.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use orchestration::debate::{DebateError, DebateRole, Utterance};
use orchestration::events::{END_EVENT, END_SENTINEL, KEEPALIVE_TEXT};
use orchestration::{Chunk, ChunkStream, Speaker, SpeakerContext};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, SharedState};

/// Request body of a direct role call.
#[derive(Debug, Default, Deserialize)]
pub struct RoleCall {
    #[serde(default)]
    pub input: RoleInput,
    #[serde(default)]
    pub label: Option<String>,
}

/// Role-specific input fields; which ones are required depends on the role.
#[derive(Debug, Default, Deserialize)]
pub struct RoleInput {
    pub topic: Option<String>,
    pub proposal: Option<String>,
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleOutput {
    pub role: String,
    pub label: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleCallError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("missing input for {role}: {}", .fields.join(", "))]
    MissingInput {
        role: DebateRole,
        fields: Vec<&'static str>,
    },

    #[error("invalid {0} request: {1}")]
    InvalidBody(DebateRole, String),
}

impl From<RoleCallError> for ApiError {
    fn from(err: RoleCallError) -> Self {
        match err {
            RoleCallError::UnknownRole(_) => ApiError::NotFound(err.to_string()),
            RoleCallError::MissingInput { .. } | RoleCallError::InvalidBody(..) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

pub fn parse_role(name: &str) -> Result<DebateRole, RoleCallError> {
    match name {
        "proposer" => Ok(DebateRole::Proposer),
        "challenger" => Ok(DebateRole::Challenger),
        "arbitrator" => Ok(DebateRole::Arbitrator),
        other => Err(RoleCallError::UnknownRole(other.to_string())),
    }
}

impl RoleInput {
    /// Build the speaker context for `role`, reporting every missing field.
    pub fn context(&self, role: DebateRole) -> Result<SpeakerContext, RoleCallError> {
        let required: Vec<(&'static str, &Option<String>)> = match role {
            DebateRole::Proposer => vec![("topic", &self.topic)],
            DebateRole::Challenger => vec![("proposal", &self.proposal)],
            DebateRole::Arbitrator => vec![
                ("proposal", &self.proposal),
                ("challenge", &self.challenge),
            ],
        };
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| filled(value).is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(RoleCallError::MissingInput {
                role,
                fields: missing,
            });
        }

        let text = |value: &Option<String>| filled(value).unwrap_or_default().to_string();
        Ok(match role {
            DebateRole::Proposer => SpeakerContext::proposal(&text(&self.topic)),
            DebateRole::Challenger => SpeakerContext::Challenge {
                proposal: text(&self.proposal),
            },
            DebateRole::Arbitrator => SpeakerContext::Judgement {
                proposal: text(&self.proposal),
                challenge: text(&self.challenge),
            },
        })
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Resolve the path role and body into a speaker, its context, and the label used.
fn prepare(
    state: &SharedState,
    role: &str,
    body: &Bytes,
) -> Result<(DebateRole, Arc<dyn Speaker>, SpeakerContext, String), RoleCallError> {
    let role = parse_role(role)?;
    let call: RoleCall = if body.iter().all(u8::is_ascii_whitespace) {
        RoleCall::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| RoleCallError::InvalidBody(role, e.to_string()))?
    };
    let context = call.input.context(role)?;
    let label = call.label.as_deref().unwrap_or_default().trim().to_string();
    let speaker = state.speakers.build(role, &label);
    info!(%role, label = %label, "direct role call");
    Ok((role, speaker, context, label))
}

pub async fn invoke(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    body: Bytes,
) -> Result<Json<RoleOutput>, ApiError> {
    let (role, speaker, context, label) = prepare(&state, &role, &body)?;
    let upstream = |err: DebateError| {
        warn!(%role, error = %err, "direct role call failed");
        ApiError::BadGateway(err.to_string())
    };

    let mut chunks = speaker
        .generate(&context)
        .await
        .map_err(|source| upstream(DebateError::Speaker { role, source }))?;
    let mut reply = Utterance::new(role);
    while let Some(item) = chunks.next().await {
        match item.map_err(|source| upstream(DebateError::Speaker { role, source }))? {
            Chunk::Text(text) => reply.push(&text),
            Chunk::Malformed(raw) => {
                debug!(%role, raw = %raw, "malformed chunk");
                return Err(upstream(DebateError::InvalidResponseFormat(role)));
            }
        }
    }

    Ok(Json(RoleOutput {
        role: role.to_string(),
        label,
        output: reply.into_text(),
    }))
}

pub async fn stream_role(
    State(state): State<SharedState>,
    Path(role): Path<String>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (role, speaker, context, _label) = prepare(&state, &role, &body)?;

    let events = stream::unfold(
        RoleStream::Pending { speaker, context },
        move |step| async move {
            match step {
                RoleStream::Pending { speaker, context } => {
                    match speaker.generate(&context).await {
                        Ok(chunks) => next_fragment(role, chunks).await,
                        Err(source) => {
                            let err = DebateError::Speaker { role, source };
                            Some((error_event(&err), RoleStream::Ending))
                        }
                    }
                }
                RoleStream::Streaming(chunks) => next_fragment(role, chunks).await,
                RoleStream::Ending => Some((end_event(), RoleStream::Done)),
                RoleStream::Done => None,
            }
        },
    )
    .map(Ok::<Event, Infallible>);

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.keepalive)
            .text(KEEPALIVE_TEXT),
    ))
}

enum RoleStream {
    Pending {
        speaker: Arc<dyn Speaker>,
        context: SpeakerContext,
    },
    Streaming(ChunkStream),
    Ending,
    Done,
}

async fn next_fragment(role: DebateRole, mut chunks: ChunkStream) -> Option<(Event, RoleStream)> {
    let event = match chunks.next().await {
        Some(Ok(Chunk::Text(text))) => {
            let data = serde_json::Value::String(text).to_string();
            return Some((
                Event::default().event("data").data(data),
                RoleStream::Streaming(chunks),
            ));
        }
        Some(Ok(Chunk::Malformed(raw))) => {
            debug!(%role, raw = %raw, "malformed chunk");
            error_event(&DebateError::InvalidResponseFormat(role))
        }
        Some(Err(source)) => error_event(&DebateError::Speaker { role, source }),
        None => return Some((end_event(), RoleStream::Done)),
    };
    Some((event, RoleStream::Ending))
}

fn error_event(err: &DebateError) -> Event {
    warn!(error = %err, "direct role stream failed");
    Event::default()
        .event("error")
        .data(json!({"status": "error", "message": err.to_string()}).to_string())
}

fn end_event() -> Event {
    Event::default().event(END_EVENT).data(END_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("challenger"), Ok(DebateRole::Challenger));
        assert_eq!(
            parse_role("moderator"),
            Err(RoleCallError::UnknownRole("moderator".into()))
        );
    }

    #[test]
    fn test_context_per_role() {
        let input = RoleInput {
            topic: Some("storage".into()),
            proposal: Some("flywheels".into()),
            challenge: Some("cost".into()),
        };
        assert_eq!(
            input.context(DebateRole::Proposer).unwrap(),
            SpeakerContext::proposal("storage")
        );
        assert_eq!(
            input.context(DebateRole::Arbitrator).unwrap(),
            SpeakerContext::Judgement {
                proposal: "flywheels".into(),
                challenge: "cost".into(),
            }
        );
    }

    #[test]
    fn test_missing_input_lists_fields() {
        let input = RoleInput {
            proposal: Some(" ".into()),
            ..Default::default()
        };
        let err = input.context(DebateRole::Arbitrator).unwrap_err();
        assert_eq!(
            err,
            RoleCallError::MissingInput {
                role: DebateRole::Arbitrator,
                fields: vec!["proposal", "challenge"],
            }
        );
        assert_eq!(
            err.to_string(),
            "missing input for arbitrator: proposal, challenge"
        );
    }
}
