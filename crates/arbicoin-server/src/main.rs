//! ArbiCoin game session server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod persist;
mod protocol;
mod server;
mod session;

use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        save_dir = %config.save_dir.display(),
        regen_ms = config.regen_interval.as_millis() as u64,
        "Starting ArbiCoin server..."
    );

    let (storage, save_rx) = persist::save_queue(config.save_dir.clone());
    tokio::spawn(storage.writer().run(save_rx));

    let state = Arc::new(ServerState::new(storage));

    tokio::spawn(server::run_regen_ticker(
        Arc::clone(&state),
        config.regen_interval,
    ));

    server::run_server(config.addr, state).await
}
