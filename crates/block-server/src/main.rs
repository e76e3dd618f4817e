mod block;
mod client;
mod config;
mod dispatch;
mod gateway_task;
mod ship;

use config::ShipConfig;
use ship::Ship;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/ship.toml".to_string());
    let config = ShipConfig::load(Path::new(&config_path))?;
    info!(
        ship = %config.name,
        blocks = config.block_count,
        base_port = config.base_port,
        "loaded ship configuration"
    );

    let ship = Arc::new(Ship::load(config)?);

    let shutdown_ship = ship.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal, kicking off graceful shutdown");
            shutdown_ship.request_shutdown();
        }
    });

    if let Err(e) = ship.run().await {
        error!("ship run loop exited with error: {}", e);
        return Err(e);
    }

    info!("ship shut down cleanly");
    Ok(())
}
