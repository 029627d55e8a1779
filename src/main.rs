//! order-relay — order intake API with a transactional outbox relay
//!
//! Long-running service that:
//! - Accepts orders over HTTP, writing the order row and its outbox event
//!   in a single transaction
//! - Relays pending outbox events to NATS JetStream from a background
//!   dispatcher, marking them processed in the same transaction that
//!   locked them
//! - Serves point lookups and the full order list for convergence checks

mod api;
mod broker;
mod config;
mod db;
mod error;
mod model;
mod relay;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use broker::Broker;
use config::Config;
use relay::Dispatcher;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upper bound on the whole shutdown sequence
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_relay=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let cancel = CancellationToken::new();

    tracing::info!("Connecting to message broker...");
    let broker = Arc::new(Broker::connect(&config).await?);
    broker.provision().await?;

    tracing::info!("Connecting to database...");
    let state = AppState::new(&config).await?;

    tracing::info!("Starting outbox dispatcher...");
    let dispatcher = Dispatcher::new(
        state.pool.clone(),
        broker.clone(),
        config.batch_size,
        config.tick_interval,
        cancel.clone(),
    );
    let dispatcher_handle = dispatcher.start();

    let app = api::create_router(state.clone());
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leaves-first teardown. HTTP has already stopped; the dispatcher
    // finishes its current tick, then the broker drains, then the pool
    // closes.
    tracing::info!("Starting graceful shutdown...");
    cancel.cancel();

    let teardown = async {
        dispatcher_handle.stop().await;
        if let Err(e) = broker.drain().await {
            tracing::error!(error = %e, "Broker drain failed");
        }
        state.pool.close().await;
    };

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, teardown)
        .await
        .is_err()
    {
        tracing::error!("Shutdown did not complete within {SHUTDOWN_TIMEOUT:?}");
    } else {
        tracing::info!("Shutdown complete");
    }

    Ok(())
}

/// Graceful shutdown handler
///
/// Listens for SIGTERM and Ctrl+C signals
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
