use anyhow::{Context, Result};
use arena_server::config::{ArenaConfig, Args};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; only the process environment is used then.
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let args = Args::parse();
    let mut config = ArenaConfig::from_env().context("Invalid ARENA_* environment")?;
    config
        .apply_args(args)
        .context("Invalid command-line arguments")?;

    info!(
        bind = %config.bind,
        llm_url = %config.default_endpoint.url,
        model = %config.default_endpoint.model,
        cors_origin = %config.cors_origin,
        "starting debate arena"
    );

    arena_server::server::start_server(config).await
}
