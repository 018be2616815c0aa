//! Event protocol for a debate stream.
//!
//! 1. **Event Types** (`types.rs`): the eight event kinds a client can see,
//!    serialized as `type`-tagged JSON.
//!
//! 2. **Emitter** (`emitter.rs`): ordered, bounded delivery from the
//!    orchestrator to the transport, plus the end-of-stream sentinel.
//!
//! # Frame order for a successful run
//!
//! ```text
//! connected → proposal* → (challenge* → judgement* → pause → round_end)×N
//!           → debate_end → [DONE]
//! ```

pub mod emitter;
pub mod types;

pub use emitter::{
    EmitError, EventEmitter, WireFrame, CHANNEL_CAPACITY, END_EVENT, END_SENTINEL, KEEPALIVE_TEXT,
};
pub use types::{DebateEvent, RoundProgress};
