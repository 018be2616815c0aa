//! Wire event types for a debate stream.
//!
//! Each event serializes to one JSON object with a `type` tag. Events are
//! write-once: the orchestrator never revises or reorders them.

use serde::{Deserialize, Serialize};

use crate::debate::DebateRole;

/// Progress payload carried by `round_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundProgress {
    pub message: String,
    pub current_round: u32,
    pub total_rounds: u32,
}

impl RoundProgress {
    pub fn new(current_round: u32, total_rounds: u32) -> Self {
        Self {
            message: format!("round {} finished", current_round),
            current_round,
            total_rounds,
        }
    }
}

/// All events a debate stream can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// Stream opened.
    Connected { content: String, session_id: String },

    /// One proposer fragment.
    Proposal { role: String, content: String },

    /// One challenger fragment.
    Challenge { role: String, content: String },

    /// One arbitrator fragment.
    Judgement { role: String, content: String },

    /// The round's judgement is complete; waiting for a continue signal.
    Pause { content: String },

    /// A continue signal was observed.
    RoundEnd { content: RoundProgress },

    /// Terminal failure for the session.
    Error { content: String },

    /// Last event before the end sentinel.
    DebateEnd { content: String },
}

impl DebateEvent {
    pub fn connected(session_id: &str) -> Self {
        Self::Connected {
            content: "stream connected".to_string(),
            session_id: session_id.to_string(),
        }
    }

    /// Content event for `role`, tagged with that role's label.
    pub fn fragment(role: DebateRole, label: &str, content: &str) -> Self {
        let role_label = label.to_string();
        let content = content.to_string();
        match role {
            DebateRole::Proposer => Self::Proposal {
                role: role_label,
                content,
            },
            DebateRole::Challenger => Self::Challenge {
                role: role_label,
                content,
            },
            DebateRole::Arbitrator => Self::Judgement {
                role: role_label,
                content,
            },
        }
    }

    pub fn pause() -> Self {
        Self::Pause {
            content: "waiting for continue signal".to_string(),
        }
    }

    pub fn round_end(current_round: u32, total_rounds: u32) -> Self {
        Self::RoundEnd {
            content: RoundProgress::new(current_round, total_rounds),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            content: message.into(),
        }
    }

    pub fn debate_end() -> Self {
        Self::DebateEnd {
            content: "debate finished".to_string(),
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Proposal { .. } => "proposal",
            Self::Challenge { .. } => "challenge",
            Self::Judgement { .. } => "judgement",
            Self::Pause { .. } => "pause",
            Self::RoundEnd { .. } => "round_end",
            Self::Error { .. } => "error",
            Self::DebateEnd { .. } => "debate_end",
        }
    }

    /// Fragment text for content events.
    pub fn fragment_content(&self) -> Option<&str> {
        match self {
            Self::Proposal { content, .. }
            | Self::Challenge { content, .. }
            | Self::Judgement { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Whether this is a proposal, challenge, or judgement fragment.
    pub fn is_content(&self) -> bool {
        self.fragment_content().is_some()
    }

    /// JSON body for one frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_shape() {
        let event = DebateEvent::fragment(DebateRole::Proposer, "deepseek", "Use ");
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "proposal", "role": "deepseek", "content": "Use "})
        );
    }

    #[test]
    fn test_round_end_shape() {
        let value = serde_json::to_value(DebateEvent::round_end(1, 3)).unwrap();
        assert_eq!(value["type"], "round_end");
        assert_eq!(value["content"]["current_round"], 1);
        assert_eq!(value["content"]["total_rounds"], 3);
        assert!(value["content"]["message"].is_string());
    }

    #[test]
    fn test_event_accessors() {
        let event = DebateEvent::fragment(DebateRole::Arbitrator, "kimi", "Valid.");
        assert_eq!(event.event_type(), "judgement");
        assert_eq!(event.fragment_content(), Some("Valid."));
        assert!(event.is_content());

        assert!(!DebateEvent::pause().is_content());
        assert_eq!(DebateEvent::debate_end().event_type(), "debate_end");
        assert_eq!(DebateEvent::error("boom").event_type(), "error");
    }

    #[test]
    fn test_connected_carries_session_id() {
        let value = serde_json::to_value(DebateEvent::connected("abc")).unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["session_id"], "abc");
    }

    #[test]
    fn test_event_deserialization() {
        let parsed: DebateEvent =
            serde_json::from_str(r#"{"type":"challenge","role":"qwen","content":"Cost."}"#)
                .unwrap();
        assert_eq!(
            parsed,
            DebateEvent::fragment(DebateRole::Challenger, "qwen", "Cost.")
        );
    }
}
