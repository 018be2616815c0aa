//! Debate arena orchestration library
//!
//! Transport-free core of the debate arena:
//! - `debate`: the round state machine, history ledger, pause gate, and role prompts
//! - `events`: the wire event protocol and the per-session emitter
//! - `speaker`: the interface every generative backend implements
//!
//! # Usage
//!
//! ```ignore
//! use orchestration::debate::{DebateOrchestrator, DebateRequest, PauseGate};
//! use orchestration::events::EventEmitter;
//!
//! let gate = PauseGate::new();
//! let (mut emitter, frames) = EventEmitter::channel("session-1");
//! let orchestrator = DebateOrchestrator::new("session-1", request, speakers, gate.clone());
//!
//! // Elsewhere: forward `frames` to the client, call `gate.release()` on continue.
//! let outcome = orchestrator.run(&mut emitter).await;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;
pub mod events;
pub mod speaker;

pub use debate::{
    DebateError, DebateOrchestrator, DebateOutcome, DebatePhase, DebateRequest, DebateRole,
    HistoryLedger, Pacing, PauseGate, RoundRecord,
};
pub use events::{DebateEvent, EventEmitter, WireFrame};
pub use speaker::{Chunk, ChunkStream, Speaker, SpeakerContext, SpeakerError, SpeakerSet};
