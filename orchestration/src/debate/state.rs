//! Debate state machine — phases, transitions, and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Session created, parameters not yet checked.
    Init,
    /// Checking the start parameters.
    Validating,
    /// Proposer is streaming the (single) proposal.
    Proposing,
    /// Challenger is streaming a challenge for the current round.
    Challenging,
    /// Arbitrator is streaming a judgement for the current round.
    Judging,
    /// Waiting on the pause gate for a continue signal.
    Paused,
    /// All rounds finished.
    Ended,
    /// Validation, content, or speaker failure.
    Failed,
    /// The client went away; nothing more can be delivered.
    Disconnected,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Failed | Self::Disconnected)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Init => &[Self::Validating, Self::Disconnected],
            Self::Validating => &[Self::Proposing, Self::Failed, Self::Disconnected],
            Self::Proposing => &[
                Self::Challenging,
                Self::Ended,
                Self::Failed,
                Self::Disconnected,
            ],
            Self::Challenging => &[Self::Judging, Self::Failed, Self::Disconnected],
            Self::Judging => &[Self::Paused, Self::Failed, Self::Disconnected],
            Self::Paused => &[
                Self::Challenging,
                Self::Ended,
                Self::Failed,
                Self::Disconnected,
            ],
            Self::Ended | Self::Failed | Self::Disconnected => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Validating => write!(f, "validating"),
            Self::Proposing => write!(f, "proposing"),
            Self::Challenging => write!(f, "challenging"),
            Self::Judging => write!(f, "judging"),
            Self::Paused => write!(f, "paused"),
            Self::Ended => write!(f, "ended"),
            Self::Failed => write!(f, "failed"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Role of a participant in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateRole {
    /// Produces the proposal.
    Proposer,
    /// Attacks the proposal.
    Challenger,
    /// Weighs proposal against challenge.
    Arbitrator,
}

impl DebateRole {
    /// Noun used in operator-facing messages ("empty proposal").
    pub fn artifact(self) -> &'static str {
        match self {
            Self::Proposer => "proposal",
            Self::Challenger => "challenge",
            Self::Arbitrator => "judgement",
        }
    }
}

impl std::fmt::Display for DebateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposer => write!(f, "proposer"),
            Self::Challenger => write!(f, "challenger"),
            Self::Arbitrator => write!(f, "arbitrator"),
        }
    }
}

/// Free-text labels naming which backing service plays each role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLabels {
    pub proposer: String,
    pub challenger: String,
    pub arbitrator: String,
}

impl RoleLabels {
    pub fn label(&self, role: DebateRole) -> &str {
        match role {
            DebateRole::Proposer => &self.proposer,
            DebateRole::Challenger => &self.challenger,
            DebateRole::Arbitrator => &self.arbitrator,
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    /// Previous phase.
    pub from: DebatePhase,
    /// New phase.
    pub to: DebatePhase,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

/// A debate session tracking phase and round position.
///
/// Owned by exactly one orchestrator; nothing here is shared across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    /// Unique session identifier.
    pub id: String,
    /// Current phase.
    pub phase: DebatePhase,
    /// Current round number (0 until the first challenge starts).
    pub current_round: u32,
    /// Configured number of challenge/judgement rounds.
    pub total_rounds: u32,
    /// Transition history.
    pub transitions: Vec<DebateTransition>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    /// Create a new debate session in `Init`.
    pub fn new(id: &str, total_rounds: u32) -> Self {
        Self {
            id: id.to_string(),
            phase: DebatePhase::Init,
            current_round: 0,
            total_rounds,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        tracing::debug!(
            session_id = %self.id,
            from = %self.phase,
            to = %to,
            reason,
            "debate phase transition"
        );

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        // Each challenge opens a new round.
        if to == DebatePhase::Challenging {
            self.current_round += 1;
        }

        Ok(())
    }

    /// Whether the debate has ended.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether another challenge/judgement round should run.
    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.total_rounds
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | session={}",
            self.phase, self.current_round, self.total_rounds, self.id
        )
    }
}
