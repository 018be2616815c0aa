use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::api::{build_router, AppState};
use crate::config::ArenaConfig;
use crate::speakers::OpenAiSpeakerFactory;

/// Start the arena server and run until Ctrl+C.
pub async fn start_server(config: ArenaConfig) -> Result<()> {
    let factory = OpenAiSpeakerFactory::from_config(&config)?;
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config, Arc::new(factory)));
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "debate arena listening");

    // Paused streams would hold graceful shutdown open forever; closing the
    // gates ends them with an error frame and the end sentinel.
    let sessions = state.sessions.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            sessions.close_all();
        })
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
