//! Streaming speaker for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use orchestration::debate::prompts::{self, RolePrompt};
use orchestration::{ChunkStream, Speaker, SpeakerContext, SpeakerError};
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use tracing::debug;

use super::sse::decode_body;
use crate::config::SpeakerEndpoint;

/// One role label bound to one chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiSpeaker {
    client: reqwest::Client,
    endpoint: SpeakerEndpoint,
    label: String,
}

impl OpenAiSpeaker {
    pub fn new(client: reqwest::Client, endpoint: SpeakerEndpoint, label: &str) -> Self {
        Self {
            client,
            endpoint,
            label: label.to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.endpoint.url.trim_end_matches('/')
        )
    }

    fn auth_header(&self) -> Option<String> {
        self.endpoint
            .api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
            .map(|key| format!("Bearer {}", key))
    }

    /// Request body for one streamed completion.
    pub fn payload(&self, prompt: &RolePrompt) -> Value {
        json!({
            "model": self.endpoint.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": self.endpoint.temperature.unwrap_or(prompt.temperature),
            "stream": true,
        })
    }
}

#[async_trait]
impl Speaker for OpenAiSpeaker {
    async fn generate(&self, context: &SpeakerContext) -> Result<ChunkStream, SpeakerError> {
        let prompt = prompts::render(context);
        let role = context.role();
        debug!(label = %self.label, %role, model = %self.endpoint.model, "requesting completion");

        let mut request = self.client.post(self.url()).json(&self.payload(&prompt));
        if let Some(auth) = self.auth_header() {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpeakerError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeakerError::Upstream {
                status: status.as_u16(),
                body: upstream_message(&body),
            });
        }

        Ok(decode_body(response.bytes_stream()))
    }
}

/// Prefer the provider's `error.message` over the raw body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
