//! Debate Orchestration — Proposer / Challenger / Arbitrator rounds
//!
//! State machine for one streamed debate session. The proposal is generated
//! once; each round then pairs a fresh challenge with a judgement and pauses
//! until a human sends a continue signal.
//!
//! # Debate Flow
//!
//! ```text
//! Init → Validating → Proposing ─┬─ rounds = 0 ──────────────────────▶ Ended
//!            │            │      │
//!            │            │      └▶ Challenging → Judging → Paused ─┬▶ Challenging
//!            │            │              │           │        │     └▶ Ended
//!            ▼            ▼              ▼           ▼        ▼
//!          Failed ◀───────┴──────────────┴───────────┴────────┘
//!
//!  any phase ── client gone ──▶ Disconnected
//! ```

pub mod history;
pub mod orchestrator;
pub mod pause;
pub mod prompts;
pub mod request;
pub mod state;

pub use history::{HistoryLedger, ProposalTopic, RoundRecord, TopicHistory, HISTORY_MARKER};
pub use orchestrator::{DebateError, DebateOrchestrator, DebateOutcome, Pacing, Utterance};
pub use pause::{GateError, GateSignal, PauseGate, PauseWait};
pub use prompts::{default_temperature, RolePrompt};
pub use request::{DebateParams, DebateRequest, DEFAULT_ROUNDS};
pub use state::{
    DebatePhase, DebateRole, DebateSession, DebateTransition, RoleLabels, TransitionError,
};
