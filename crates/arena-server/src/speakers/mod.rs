//! Speaker construction per role label.
//!
//! A debate request names each role by label (e.g. `deepseek`, `kimi`). The
//! factory turns those labels into concrete speakers; labels with no catalog
//! entry use the default endpoint.

pub mod openai;
pub mod sse;

use std::sync::Arc;

use anyhow::{Context, Result};
use orchestration::debate::DebateRole;
use orchestration::{DebateRequest, Speaker, SpeakerSet};
use tracing::info;

use crate::config::{ArenaConfig, SpeakerCatalog, SpeakerEndpoint};

pub use openai::OpenAiSpeaker;
pub use sse::{decode_body, parse_delta, Delta, SseDecoder};

/// Builds the speaker playing `role` under `label`.
///
/// `OpenAiSpeakerFactory` backs the server; tests supply scripted speakers.
pub trait SpeakerFactory: Send + Sync {
    fn build(&self, role: DebateRole, label: &str) -> Arc<dyn Speaker>;

    /// All three speakers for a start request. Missing labels get the default.
    fn speaker_set(&self, request: &DebateRequest) -> SpeakerSet {
        let label = |value: &Option<String>| {
            value.as_deref().unwrap_or_default().trim().to_string()
        };
        SpeakerSet {
            proposer: self.build(DebateRole::Proposer, &label(&request.proposer)),
            challenger: self.build(DebateRole::Challenger, &label(&request.challenger)),
            arbitrator: self.build(DebateRole::Arbitrator, &label(&request.arbitrator)),
        }
    }
}

/// Factory backed by the configured endpoints.
pub struct OpenAiSpeakerFactory {
    client: reqwest::Client,
    default_endpoint: SpeakerEndpoint,
    catalog: SpeakerCatalog,
}

impl OpenAiSpeakerFactory {
    pub fn new(default_endpoint: SpeakerEndpoint, catalog: SpeakerCatalog) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            default_endpoint,
            catalog,
        })
    }

    pub fn from_config(config: &ArenaConfig) -> Result<Self> {
        let catalog = config.load_catalog()?;
        info!(
            default_url = %config.default_endpoint.url,
            default_model = %config.default_endpoint.model,
            labels = ?catalog.labels(),
            "speaker catalog loaded"
        );
        Self::new(config.default_endpoint.clone(), catalog)
    }

    pub fn endpoint_for(&self, label: &str) -> SpeakerEndpoint {
        self.catalog.resolve(label, &self.default_endpoint)
    }
}

impl SpeakerFactory for OpenAiSpeakerFactory {
    fn build(&self, _role: DebateRole, label: &str) -> Arc<dyn Speaker> {
        Arc::new(OpenAiSpeaker::new(
            self.client.clone(),
            self.endpoint_for(label),
            label,
        ))
    }
}
