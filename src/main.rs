//! Leaderboard Server
//!
//! Binary entry point: logging, environment configuration, store wiring,
//! and the serve loop. Set `REDIS_URL` for the persistent backend and
//! `LEADERBOARD_ADDR` to override the bind address.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use leaderboard::{
    Dispatcher, HttpServer, Leaderboards, MemoryScoreStore, RedisScoreStore, ScoreStore,
    ServerConfig, MAX_BOARDS, MAX_SCORE, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Leaderboard Server v{}", VERSION);
    info!("Boards: {}, score range: 1..{}", MAX_BOARDS, MAX_SCORE);

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("LEADERBOARD_ADDR") {
        config.bind_addr = addr.parse().context("invalid LEADERBOARD_ADDR")?;
    }

    let store: Arc<dyn ScoreStore> = match std::env::var("REDIS_URL") {
        Ok(url) => {
            info!("Using redis store at {}", url);
            let store = RedisScoreStore::connect(&url)
                .await
                .context("redis connection failed")?;
            Arc::new(store)
        }
        Err(_) => {
            warn!("REDIS_URL not set, using in-memory store; scores will not survive restarts");
            Arc::new(MemoryScoreStore::new())
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(Leaderboards::new(store)));
    let server = HttpServer::bind(config, dispatcher)
        .await
        .context("failed to start server")?;

    server.run().await?;
    Ok(())
}
