//! History ledger — append-only record of completed rounds.
//!
//! The ledger renders to a delimited text blob that a caller may append to a
//! new topic string. [`ProposalTopic::parse`] recognises that blob again on
//! the way in, which is how a follow-up session's proposer learns about
//! earlier rounds. Nothing here consults the ledger automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delimiter opening every rendered round block.
pub const HISTORY_MARKER: &str = "\n[Round ";

/// One completed challenge/judgement round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-indexed).
    pub round: u32,
    /// The session's single proposal.
    pub proposal: String,
    pub challenge: String,
    pub judgement: String,
    pub completed_at: DateTime<Utc>,
}

impl RoundRecord {
    pub fn new(round: u32, proposal: &str, challenge: &str, judgement: &str) -> Self {
        Self {
            round,
            proposal: proposal.to_string(),
            challenge: challenge.to_string(),
            judgement: judgement.to_string(),
            completed_at: Utc::now(),
        }
    }

    /// Render this round as one marker-prefixed block.
    pub fn render(&self) -> String {
        format!(
            "{}{}]\nProposal: {}\nChallenge: {}\nJudgement: {}",
            HISTORY_MARKER, self.round, self.proposal, self.challenge, self.judgement
        )
    }
}

/// Append-only sequence of completed rounds for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLedger {
    rounds: Vec<RoundRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed round. Records are never revised after this.
    pub fn append(&mut self, record: RoundRecord) {
        debug_assert!(
            self.rounds.last().map_or(true, |last| last.round < record.round),
            "rounds must be appended in increasing order"
        );
        self.rounds.push(record);
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Deterministic serialization: every round block in round order.
    pub fn render(&self) -> String {
        self.rounds.iter().map(RoundRecord::render).collect()
    }

    /// Build the topic string for a follow-up session.
    pub fn fold_into_topic(&self, base_topic: &str) -> String {
        format!("{}{}", base_topic, self.render())
    }
}

/// Prior-round history carried inside a topic string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "history", rename_all = "snake_case")]
pub enum TopicHistory {
    None,
    /// Rendered ledger text, starting at the first marker.
    Rendered(String),
}

/// A topic split into its subject and any folded-in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTopic {
    pub base: String,
    pub history: TopicHistory,
}

impl ProposalTopic {
    /// Split at the first history marker, if any.
    pub fn parse(topic: &str) -> Self {
        match topic.find(HISTORY_MARKER) {
            Some(idx) => Self {
                base: topic[..idx].to_string(),
                history: TopicHistory::Rendered(topic[idx..].to_string()),
            },
            None => Self {
                base: topic.to_string(),
                history: TopicHistory::None,
            },
        }
    }

    pub fn has_history(&self) -> bool {
        matches!(self.history, TopicHistory::Rendered(_))
    }
}
