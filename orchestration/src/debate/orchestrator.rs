//! Debate orchestrator — drives one session from start parameters to the end sentinel.
//!
//! Ties together the state machine, speakers, history ledger, pause gate,
//! and event emitter. Every exit path, success or failure, finishes with
//! `debate_end` and the end sentinel unless the client has already gone.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::history::{HistoryLedger, RoundRecord};
use super::pause::{GateError, GateSignal, PauseGate, PauseWait};
use super::request::{DebateParams, DebateRequest};
use super::state::{DebatePhase, DebateRole, DebateSession, RoleLabels, TransitionError};
use crate::events::{DebateEvent, EmitError, EventEmitter};
use crate::speaker::{Chunk, SpeakerContext, SpeakerError, SpeakerSet};

/// Inter-fragment delays, per phase.
///
/// Presentation only: a smoother typing effect for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    pub proposal: Duration,
    pub challenge: Duration,
    pub judgement: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            proposal: Duration::from_millis(50),
            challenge: Duration::from_millis(100),
            judgement: Duration::from_millis(50),
        }
    }
}

impl Pacing {
    /// No artificial delay at all.
    pub fn none() -> Self {
        Self {
            proposal: Duration::ZERO,
            challenge: Duration::ZERO,
            judgement: Duration::ZERO,
        }
    }

    pub fn delay(&self, role: DebateRole) -> Duration {
        match role {
            DebateRole::Proposer => self.proposal,
            DebateRole::Challenger => self.challenge,
            DebateRole::Arbitrator => self.judgement,
        }
    }
}

/// Error from the debate orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebateError {
    #[error("missing required parameter(s): {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("empty {}", .0.artifact())]
    EmptyContent(DebateRole),

    #[error("invalid response format from {0}")]
    InvalidResponseFormat(DebateRole),

    #[error("{role} failed: {source}")]
    Speaker {
        role: DebateRole,
        #[source]
        source: SpeakerError,
    },

    #[error("session closed before continue signal")]
    GateClosed,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("client disconnected")]
    Disconnected,
}

impl From<EmitError> for DebateError {
    fn from(_: EmitError) -> Self {
        Self::Disconnected
    }
}

impl From<GateError> for DebateError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Closed => Self::GateClosed,
            // Only the orchestrator arms its own gate, once per round.
            GateError::AlreadyPaused | GateError::NotPaused => Self::GateClosed,
        }
    }
}

/// One role's turn, accumulated fragment by fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub role: DebateRole,
    pub fragments: Vec<String>,
    text: String,
}

impl Utterance {
    pub fn new(role: DebateRole) -> Self {
        Self {
            role,
            fragments: Vec::new(),
            text: String::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
        self.text.push_str(fragment);
    }

    /// Concatenated text so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the turn produced any visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    /// Final phase the session ended in.
    pub terminal_phase: DebatePhase,
    /// Rounds whose judgement completed.
    pub rounds_completed: u32,
    /// The failure, if the session did not end cleanly.
    pub error: Option<DebateError>,
    /// Full proposal text (empty if proposing never finished).
    pub proposal: String,
    /// Completed rounds.
    pub ledger: HistoryLedger,
    /// The session snapshot at completion.
    pub session: DebateSession,
}

impl DebateOutcome {
    pub fn is_success(&self) -> bool {
        self.terminal_phase == DebatePhase::Ended
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        let status = match self.terminal_phase {
            DebatePhase::Ended => "ENDED",
            DebatePhase::Disconnected => "DISCONNECTED",
            _ => "FAILED",
        };
        format!(
            "[{}] {}/{} rounds | session={}",
            status, self.rounds_completed, self.session.total_rounds, self.session.id
        )
    }
}

/// Drives one debate session.
///
/// Usage:
/// 1. Create with `new()`, optionally `with_pacing()`
/// 2. Create an emitter with `EventEmitter::channel()` and hand its receiver to the transport
/// 3. Keep a clone of the pause gate where continue signals arrive
/// 4. `run()` until it returns the outcome
pub struct DebateOrchestrator {
    session: DebateSession,
    request: DebateRequest,
    speakers: SpeakerSet,
    gate: PauseGate,
    pacing: Pacing,
    ledger: HistoryLedger,
    proposal: String,
}

impl DebateOrchestrator {
    pub fn new(
        session_id: &str,
        request: DebateRequest,
        speakers: SpeakerSet,
        gate: PauseGate,
    ) -> Self {
        Self {
            session: DebateSession::new(session_id, 0),
            request,
            speakers,
            gate,
            pacing: Pacing::default(),
            ledger: HistoryLedger::new(),
            proposal: String::new(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn session(&self) -> &DebateSession {
        &self.session
    }

    /// Run the session to completion.
    pub async fn run(mut self, emitter: &mut EventEmitter) -> DebateOutcome {
        let result = self.drive(emitter).await;

        let error = match result {
            Ok(()) => None,
            Err(DebateError::Disconnected) => {
                self.settle(DebatePhase::Disconnected, "client disconnected");
                info!(
                    session_id = %self.session.id,
                    phase = %self.session.phase,
                    "client disconnected"
                );
                Some(DebateError::Disconnected)
            }
            Err(err) => {
                warn!(session_id = %self.session.id, error = %err, "debate failed");
                self.settle(DebatePhase::Failed, &err.to_string());
                if emitter.emit(DebateEvent::error(err.to_string())).await.is_err() {
                    debug!(session_id = %self.session.id, "error frame not delivered");
                }
                Some(err)
            }
        };

        if !matches!(error, Some(DebateError::Disconnected)) && emitter.finish().await.is_err() {
            debug!(session_id = %self.session.id, "terminal frames not delivered");
        }

        let outcome = DebateOutcome {
            terminal_phase: self.session.phase,
            rounds_completed: self.ledger.len() as u32,
            error,
            proposal: self.proposal,
            ledger: self.ledger,
            session: self.session,
        };
        info!(summary = %outcome.summary_line(), "debate session closed");
        outcome
    }

    async fn drive(&mut self, emitter: &mut EventEmitter) -> Result<(), DebateError> {
        emitter.emit(DebateEvent::connected(&self.session.id)).await?;
        self.session.transition(DebatePhase::Validating, "session started")?;

        let DebateParams {
            topic,
            labels,
            rounds,
        } = self
            .request
            .validate()
            .map_err(DebateError::MissingParameters)?;
        self.session.total_rounds = rounds;
        info!(
            session_id = %self.session.id,
            proposer = %labels.proposer,
            challenger = %labels.challenger,
            arbitrator = %labels.arbitrator,
            rounds,
            "debate starting"
        );

        self.session.transition(DebatePhase::Proposing, "parameters valid")?;
        let proposal = self
            .speak(emitter, &labels, SpeakerContext::proposal(&topic))
            .await?;
        if proposal.is_blank() {
            return Err(DebateError::EmptyContent(DebateRole::Proposer));
        }
        self.proposal = proposal.into_text();

        while self.session.has_rounds_remaining() {
            self.session
                .transition(DebatePhase::Challenging, "round started")?;
            let round = self.session.current_round;

            let challenge = self
                .speak(
                    emitter,
                    &labels,
                    SpeakerContext::Challenge {
                        proposal: self.proposal.clone(),
                    },
                )
                .await?;
            if challenge.is_blank() {
                return Err(DebateError::EmptyContent(DebateRole::Challenger));
            }
            let challenge = challenge.into_text();

            self.session
                .transition(DebatePhase::Judging, "challenge complete")?;
            let judgement = self
                .speak(
                    emitter,
                    &labels,
                    SpeakerContext::Judgement {
                        proposal: self.proposal.clone(),
                        challenge: challenge.clone(),
                    },
                )
                .await?;
            if judgement.fragments.is_empty() {
                // Not fatal: the round still pauses and is recorded.
                warn!(session_id = %self.session.id, round, "arbitrator produced no fragments");
            }

            self.session
                .transition(DebatePhase::Paused, "judgement complete")?;
            // Armed before the pause frame so a continue sent in reaction to it always lands.
            let wait = self.gate.arm()?;
            emitter.emit(DebateEvent::pause()).await?;
            self.ledger.append(RoundRecord::new(
                round,
                &self.proposal,
                &challenge,
                judgement.text(),
            ));

            self.await_continue(wait, emitter).await?;
            emitter
                .emit(DebateEvent::round_end(round, self.session.total_rounds))
                .await?;
        }

        self.session
            .transition(DebatePhase::Ended, "all rounds complete")?;
        Ok(())
    }

    /// Block on the pause gate until continue, gate close, or disconnect.
    async fn await_continue(
        &self,
        wait: PauseWait,
        emitter: &EventEmitter,
    ) -> Result<(), DebateError> {
        debug!(status = %self.session.status_line(), "paused");

        let signal = tokio::select! {
            signal = wait.wait() => Some(signal),
            _ = emitter.closed() => None,
        };
        match signal {
            Some(GateSignal::Continue) => {
                debug!(session_id = %self.session.id, "continue signal received");
                Ok(())
            }
            Some(GateSignal::Closed) => Err(DebateError::GateClosed),
            None => Err(DebateError::Disconnected),
        }
    }

    /// Drain one speaker stream, forwarding each fragment as it arrives.
    async fn speak(
        &mut self,
        emitter: &mut EventEmitter,
        labels: &RoleLabels,
        context: SpeakerContext,
    ) -> Result<Utterance, DebateError> {
        let role = context.role();
        let label = labels.label(role);
        let speaker = self.speakers.for_role(role).clone();
        let delay = self.pacing.delay(role);

        let started = tokio::select! {
            biased;
            _ = emitter.closed() => None,
            started = speaker.generate(&context) => Some(started),
        };
        let mut stream = match started {
            None => return Err(DebateError::Disconnected),
            Some(result) => result.map_err(|source| DebateError::Speaker { role, source })?,
        };

        let mut utterance = Utterance::new(role);
        loop {
            let item = tokio::select! {
                biased;
                _ = emitter.closed() => return Err(DebateError::Disconnected),
                item = stream.next() => item,
            };

            match item {
                None => break,
                Some(Ok(Chunk::Text(text))) => {
                    emitter
                        .emit(DebateEvent::fragment(role, label, &text))
                        .await?;
                    utterance.push(&text);
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = emitter.closed() => return Err(DebateError::Disconnected),
                        }
                    }
                }
                Some(Ok(Chunk::Malformed(raw))) => {
                    warn!(session_id = %self.session.id, %role, raw = %raw, "malformed chunk");
                    return Err(DebateError::InvalidResponseFormat(role));
                }
                Some(Err(source)) => return Err(DebateError::Speaker { role, source }),
            }
        }

        debug!(
            session_id = %self.session.id,
            %role,
            fragments = utterance.fragments.len(),
            chars = utterance.text().len(),
            "turn complete"
        );
        Ok(utterance)
    }

    /// Move to a terminal phase; a refused transition is logged, not fatal.
    fn settle(&mut self, phase: DebatePhase, reason: &str) {
        if self.session.is_complete() {
            return;
        }
        if let Err(err) = self.session.transition(phase, reason) {
            warn!(session_id = %self.session.id, error = %err, "terminal transition refused");
        }
    }
}
