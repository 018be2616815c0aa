//! Speaker adapter — one role's generative service behind a uniform interface.
//!
//! `generate` returns a fresh one-shot stream of chunks. Streams are finite and
//! not restartable; calling `generate` again issues a new request.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debate::{DebateRole, ProposalTopic};

/// Errors from speaker calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeakerError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("stream interrupted: {0}")]
    StreamBroken(String),
}

/// One item produced by a speaker stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A text delta.
    Text(String),
    /// An item with no recognisable text; carries the raw payload for logs.
    Malformed(String),
}

/// Lazy, finite, one-shot chunk stream.
pub type ChunkStream = BoxStream<'static, Result<Chunk, SpeakerError>>;

/// What a speaker is asked to respond to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SpeakerContext {
    Proposal { topic: ProposalTopic },
    Challenge { proposal: String },
    Judgement { proposal: String, challenge: String },
}

impl SpeakerContext {
    pub fn proposal(topic: &str) -> Self {
        Self::Proposal {
            topic: ProposalTopic::parse(topic),
        }
    }

    pub fn role(&self) -> DebateRole {
        match self {
            Self::Proposal { .. } => DebateRole::Proposer,
            Self::Challenge { .. } => DebateRole::Challenger,
            Self::Judgement { .. } => DebateRole::Arbitrator,
        }
    }
}

/// A generative text service playing one role.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Start generating a response for `context`.
    async fn generate(&self, context: &SpeakerContext) -> Result<ChunkStream, SpeakerError>;
}

/// The three speakers of one session.
#[derive(Clone)]
pub struct SpeakerSet {
    pub proposer: Arc<dyn Speaker>,
    pub challenger: Arc<dyn Speaker>,
    pub arbitrator: Arc<dyn Speaker>,
}

impl SpeakerSet {
    pub fn for_role(&self, role: DebateRole) -> &Arc<dyn Speaker> {
        match role {
            DebateRole::Proposer => &self.proposer,
            DebateRole::Challenger => &self.challenger,
            DebateRole::Arbitrator => &self.arbitrator,
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
mod scripted;

#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Script, ScriptedSpeaker};
