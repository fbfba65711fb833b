//! Bomberman Arena Server
//!
//! Hosts one arena session over WebSocket and HTTP on a single port.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bomberman::{
    Game, GameServer, Hub, ServerConfig, SystemClock, COUNTDOWN, DISCONNECT_GRACE, LOBBY_JOIN_WINDOW,
    VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Bomberman Arena Server v{}", VERSION);

    let config = ServerConfig::from_env();
    info!(
        "Tick {}ms, lobby window {}s, countdown {}s, reconnect grace {}s",
        config.tick_interval.as_millis(),
        LOBBY_JOIN_WINDOW.as_secs(),
        COUNTDOWN.as_secs(),
        DISCONNECT_GRACE.as_secs()
    );

    let game = Arc::new(RwLock::new(Game::new()));
    let (hub, handle) = Hub::new(game, Arc::new(SystemClock), config.tick_interval);
    let bind_addr = config.bind_addr;

    let server = Arc::new(GameServer::new(config, handle));
    let hub_task = tokio::spawn(hub.run(server.subscribe_shutdown()));

    let serving = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        result = serving => {
            result
                .context("server task panicked")?
                .with_context(|| format!("failed to serve on {}", bind_addr))?;
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Unable to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            server.shutdown();
        }
    }

    hub_task.await.context("hub task panicked")?;
    Ok(())
}
