//! Background expiry sweep for the durable tier.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::result_cache::purge_expired_entries;
use super::store::DurableStore;
use crate::clock::Clock;

/// Periodically purges expired entries until stopped.
pub struct CacheSweeper {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Cache sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Cache sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match purge_expired_entries(&store, clock.as_ref(), ttl).await {
                            Ok(0) => debug!("Sweep found nothing to purge"),
                            Ok(removed) => info!(removed, "Purged expired results"),
                            Err(e) => warn!("Cache sweep error: {}", e),
                        }
                    }
                }
            }
            info!("Cache sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the loop to stop and wait for it.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            warn!("Cache sweeper task failed: {}", e);
        }
    }
}
