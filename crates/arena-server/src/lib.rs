//! Debate arena HTTP server.
//!
//! - `config`: environment, CLI, and speakers-catalog configuration
//! - `speakers`: OpenAI-compatible streaming speakers and the per-label factory
//! - `sessions`: registry of open sessions for continue signals
//! - `api`: axum router, SSE stream, and continue endpoint
//! - `roles`: direct single-role calls, plain and streamed
//! - `server`: listener lifecycle with graceful shutdown

#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod config;
pub mod roles;
pub mod server;
pub mod sessions;
pub mod speakers;

pub use api::{build_router, AppState, SharedState};
pub use config::{ArenaConfig, Args};
pub use sessions::SessionRegistry;
pub use speakers::{OpenAiSpeakerFactory, SpeakerFactory};
