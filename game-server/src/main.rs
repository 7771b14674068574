use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use game_server::{config::Config, create_routes, room_registry::RoomRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid LOG_LEVEL: {}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!config.is_production())
        .init();

    info!("Starting dice room server...");

    let registry = Arc::new(RoomRegistry::new());
    let idle_timeout = config.room_idle_timeout();
    registry.spawn_sweeper(idle_timeout);
    info!(
        idle_timeout_minutes = config.room_idle_timeout_minutes,
        "Idle room sweep scheduled"
    );

    let routes = create_routes(registry.clone());
    let addr = config.socket_addr()?;

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!(
        open_rooms = registry.room_count().await,
        "Server shutdown complete."
    );
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
                return;
            }
            _ => tracing::warn!("Unix signal handlers unavailable, falling back to Ctrl+C"),
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down gracefully...");
}
