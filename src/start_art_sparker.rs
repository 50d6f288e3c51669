//! Startup helpers for the art sparker server.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::server::{self, AppState};

/// Run the server (used by the `art-sparker-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting art sparker v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(&config)) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let state = initialize(config).await?;
    run_server_with_shutdown(state, config.server.port, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server stopped: {e}"))
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub async fn initialize(config: &AppConfig) -> anyhow::Result<Arc<AppState>> {
    tracing::info!(
        storage = ?config.storage.backend,
        daily_limit = config.quota.daily_limit,
        quota_enabled = config.quota.enabled,
        "Initializing state"
    );
    let state = AppState::from_config(config)
        .await
        .context("Failed to create state")?;

    if let Some(backend) = &state.backend {
        if let Some(session) = backend.refresh_stored_session(&state.sessions).await {
            tracing::info!(expires_at = session.expires_at, "Restored backend session");
        }
    }

    Ok(state)
}

/// Run server with graceful shutdown.
///
/// # Errors
/// Returns an error if the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    server::run_server_with_shutdown(state, port, shutdown_signal).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::StorageConfig;

    #[tokio::test]
    async fn test_initialize_with_memory_storage() {
        let config = AppConfig {
            storage: StorageConfig::memory(),
            ..AppConfig::default()
        };
        let state = initialize(&config).await.unwrap();
        assert!(state.backend.is_none());
        assert_eq!(state.controller.snapshot().await.count, 0);
    }
}
