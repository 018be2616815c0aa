use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use orchestration::Pacing;
use serde::Deserialize;

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid bind address {0:?}")]
    InvalidBind(String),

    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
}

/// An OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerEndpoint {
    /// Base URL; `/chat/completions` is appended.
    pub url: String,
    pub model: String,
    /// Name of the env var holding the bearer key. No header is sent when unset.
    pub api_key_env: Option<String>,
    /// Overrides the role's default sampling temperature.
    pub temperature: Option<f32>,
}

/// One `[speakers.<label>]` table. Absent fields fall back to the default endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakerEntry {
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
}

/// Role-label → endpoint table, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakerCatalog {
    #[serde(default)]
    pub speakers: HashMap<String, SpeakerEntry>,
}

impl SpeakerCatalog {
    /// Load the catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse speakers TOML")
    }

    /// Endpoint for `label`, layered over `default`.
    pub fn resolve(&self, label: &str, default: &SpeakerEndpoint) -> SpeakerEndpoint {
        let Some(entry) = self.speakers.get(label) else {
            return default.clone();
        };
        SpeakerEndpoint {
            url: entry.url.clone().unwrap_or_else(|| default.url.clone()),
            model: entry.model.clone().unwrap_or_else(|| default.model.clone()),
            api_key_env: entry
                .api_key_env
                .clone()
                .or_else(|| default.api_key_env.clone()),
            temperature: entry.temperature.or(default.temperature),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.speakers.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

/// Command-line overrides.
#[derive(Parser, Debug, Default)]
#[command(name = "arena-server", about = "Streams three-role debates over SSE")]
pub struct Args {
    /// Listen address, e.g. 0.0.0.0:8000
    #[arg(long)]
    pub bind: Option<String>,

    /// TOML file mapping role labels to endpoints
    #[arg(long)]
    pub speakers_file: Option<PathBuf>,

    /// Default chat completions base URL
    #[arg(long)]
    pub llm_url: Option<String>,

    /// Default model name
    #[arg(long)]
    pub model: Option<String>,
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub bind: String,
    /// Endpoint used for any label without its own catalog entry.
    pub default_endpoint: SpeakerEndpoint,
    pub cors_origin: String,
    pub keepalive: Duration,
    pub pacing: Pacing,
    pub speakers_file: Option<PathBuf>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
            default_endpoint: SpeakerEndpoint {
                url: "https://api.deepseek.com".into(),
                model: "deepseek-chat".into(),
                api_key_env: Some("DEEPSEEK_API_KEY".into()),
                temperature: None,
            },
            cors_origin: "http://localhost:3000".into(),
            keepalive: Duration::from_secs(10),
            pacing: Pacing::default(),
            speakers_file: None,
        }
    }
}

impl ArenaConfig {
    /// Read `ARENA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind) = lookup("ARENA_BIND") {
            config.bind = bind;
        }
        if let Some(url) = lookup("ARENA_LLM_URL") {
            config.default_endpoint.url = url;
        }
        if let Some(model) = lookup("ARENA_LLM_MODEL") {
            config.default_endpoint.model = model;
        }
        if let Some(key_env) = lookup("ARENA_API_KEY_ENV") {
            config.default_endpoint.api_key_env = Some(key_env).filter(|k| !k.is_empty());
        }
        if let Some(origin) = lookup("ARENA_CORS_ORIGIN") {
            config.cors_origin = origin;
        }
        if let Some(secs) = number(&lookup, "ARENA_KEEPALIVE_SECS")? {
            config.keepalive = Duration::from_secs(secs);
        }
        if let Some(ms) = number(&lookup, "ARENA_PROPOSAL_DELAY_MS")? {
            config.pacing.proposal = Duration::from_millis(ms);
        }
        if let Some(ms) = number(&lookup, "ARENA_CHALLENGE_DELAY_MS")? {
            config.pacing.challenge = Duration::from_millis(ms);
        }
        if let Some(ms) = number(&lookup, "ARENA_JUDGEMENT_DELAY_MS")? {
            config.pacing.judgement = Duration::from_millis(ms);
        }
        config.speakers_file = lookup("ARENA_SPEAKERS_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the environment.
    pub fn apply_args(&mut self, args: Args) -> Result<(), ConfigError> {
        if let Some(bind) = args.bind {
            self.bind = bind;
        }
        if let Some(path) = args.speakers_file {
            self.speakers_file = Some(path);
        }
        if let Some(url) = args.llm_url {
            self.default_endpoint.url = url;
        }
        if let Some(model) = args.model {
            self.default_endpoint.model = model;
        }
        self.validate()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }

    /// Load the speakers catalog, or an empty one when no file is configured.
    pub fn load_catalog(&self) -> Result<SpeakerCatalog> {
        match &self.speakers_file {
            Some(path) => SpeakerCatalog::from_file(path),
            None => Ok(SpeakerCatalog::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self
            .cors_origin
            .parse::<axum::http::HeaderValue>()
            .is_err()
        {
            return Err(ConfigError::InvalidOrigin(self.cors_origin.clone()));
        }
        Ok(())
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::from_lookup(vars(&[])).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8000");
        assert_eq!(config.default_endpoint.model, "deepseek-chat");
        assert_eq!(
            config.default_endpoint.api_key_env.as_deref(),
            Some("DEEPSEEK_API_KEY")
        );
        assert_eq!(config.keepalive, Duration::from_secs(10));
        assert_eq!(config.pacing, Pacing::default());
        assert!(config.speakers_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ArenaConfig::from_lookup(vars(&[
            ("ARENA_BIND", "0.0.0.0:9000"),
            ("ARENA_LLM_URL", "http://localhost:11434/v1"),
            ("ARENA_KEEPALIVE_SECS", "3"),
            ("ARENA_CHALLENGE_DELAY_MS", "0"),
            ("ARENA_API_KEY_ENV", ""),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.default_endpoint.url, "http://localhost:11434/v1");
        assert_eq!(config.keepalive, Duration::from_secs(3));
        assert_eq!(config.pacing.challenge, Duration::ZERO);
        assert_eq!(config.pacing.proposal, Duration::from_millis(50));
        assert!(config.default_endpoint.api_key_env.is_none());
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = ArenaConfig::from_lookup(vars(&[("ARENA_KEEPALIVE_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("ARENA_KEEPALIVE_SECS"));
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let err = ArenaConfig::from_lookup(vars(&[("ARENA_BIND", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBind(_)));
    }

    #[test]
    fn test_args_override_env() {
        let mut config = ArenaConfig::from_lookup(vars(&[("ARENA_LLM_MODEL", "qwen")])).unwrap();
        let args = Args::try_parse_from([
            "arena-server",
            "--model",
            "kimi",
            "--bind",
            "127.0.0.1:7000",
        ])
        .unwrap();
        config.apply_args(args).unwrap();
        assert_eq!(config.default_endpoint.model, "kimi");
        assert_eq!(config.bind, "127.0.0.1:7000");
    }

    #[test]
    fn test_catalog_resolution() {
        let catalog: SpeakerCatalog = toml::from_str(
            r#"
[speakers.kimi]
url = "https://api.moonshot.cn/v1"
model = "moonshot-v1-8k"
api_key_env = "MOONSHOT_API_KEY"

[speakers.cool-deepseek]
temperature = 0.2
"#,
        )
        .unwrap();
        let default = ArenaConfig::default().default_endpoint;

        let kimi = catalog.resolve("kimi", &default);
        assert_eq!(kimi.model, "moonshot-v1-8k");
        assert_eq!(kimi.api_key_env.as_deref(), Some("MOONSHOT_API_KEY"));

        let cool = catalog.resolve("cool-deepseek", &default);
        assert_eq!(cool.url, default.url);
        assert_eq!(cool.temperature, Some(0.2));

        assert_eq!(catalog.resolve("unlisted", &default), default);
        assert_eq!(catalog.labels(), vec!["cool-deepseek", "kimi"]);
    }
}
