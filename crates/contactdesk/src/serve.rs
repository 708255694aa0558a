// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `contactdesk serve` command implementation.
//!
//! Builds the storage, change feed and desk service once, injects them into
//! the gateway state and serves until SIGINT or SIGTERM.

use std::sync::Arc;

use contactdesk_config::DeskConfig;
use contactdesk_core::{ChangeFeed, DeskError};
use contactdesk_gateway::{DeskService, GatewayState, start_server};
use contactdesk_storage::SqliteStorage;
use tracing::{info, warn};

/// Runs the `contactdesk serve` command.
pub async fn run_serve(config: DeskConfig) -> Result<(), DeskError> {
    init_tracing(&config.logging.log_level);

    info!("starting contactdesk serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let feed = ChangeFeed::new(config.realtime.channel_capacity);
    let service = Arc::new(DeskService::new(storage.clone(), Some(storage), feed));

    let state = GatewayState::new(service, &config.server, config.webhooks.clone());
    start_server(&config.server, state, shutdown_signal()).await?;

    info!("contactdesk serve shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        _ = terminate => info!("received SIGTERM, initiating shutdown"),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("contactdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
