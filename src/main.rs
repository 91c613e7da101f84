//! Senet Server
//!
//! Authoritative game server for Senet over WebSocket.

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use senet::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the default level.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Senet Server v{}", VERSION);

    let config = ServerConfig::from_env();
    info!("Bind address: {}", config.bind_addr);
    info!("Connection cap: {}", config.max_connections);

    let server = GameServer::new(config);
    server.run().await?;
    Ok(())
}
