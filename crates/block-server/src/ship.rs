//! The Ship: config, the ban list and mini-ship directory shared by every
//! Block, and the task that spawns and supervises the per-block actors
//! (`spec.md` §4.1, §5: "one thread per Block, plus one for the Ship's
//! own loop").

use crate::block::Block;
use crate::config::ShipConfig;
use block_data::BanList;
use block_types::MiniShip;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared, ship-wide state every Block task holds an `Arc` to.
pub struct Ship {
    pub config: ShipConfig,
    pub bans: Arc<RwLock<BanList>>,
    /// The directory of sibling ships the gateway pushes updates for
    /// (`spec.md` §4.6 `ShipStatusPush`/`CountPush`), consulted when
    /// building the ship-select menu.
    pub mini_ships: Arc<RwLock<Vec<MiniShip>>>,
    /// Set once a shutdown has been requested; a Block accepting a new
    /// connection while this is set disconnects it immediately
    /// (`spec.md` §4.1: "accept-with-shutdown-pending immediate
    /// disconnect").
    pub shutdown_pending: Arc<AtomicBool>,
}

impl Ship {
    pub fn load(config: ShipConfig) -> anyhow::Result<Self> {
        let bans = BanList::load(&config.bans_file_path)?;

        Ok(Self {
            config,
            bans: Arc::new(RwLock::new(bans)),
            mini_ships: Arc::new(RwLock::new(Vec::new())),
            shutdown_pending: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_shutdown_pending(&self) -> bool {
        self.shutdown_pending.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_pending.store(true, Ordering::Relaxed);
    }

    /// Persist the ban list back to disk. Called on a 24h sweep cadence by
    /// each Block and on graceful shutdown.
    pub fn save_bans(&self) -> anyhow::Result<()> {
        self.bans.read().save(&self.config.bans_file_path)
    }

    /// Spawn one task per configured block and wait for all of them to
    /// exit (`spec.md` §5).
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        for block_no in 0..self.config.block_count {
            let ship = self.clone();
            handles.push(tokio::spawn(async move {
                let block = match Block::new(ship.clone(), block_no).await {
                    Ok(block) => block,
                    Err(e) => {
                        warn!("block {} failed to start: {}", block_no, e);
                        return;
                    }
                };
                info!("block {} starting", block_no);
                block.run().await;
                info!("block {} exited", block_no);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        if let Err(e) = self.save_bans() {
            warn!("failed to persist ban list on shutdown: {}", e);
        }

        Ok(())
    }
}
