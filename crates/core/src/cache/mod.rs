//! Result cache.
//!
//! Converted artifacts are kept in two tiers: an in-memory map owned by the
//! session, and an optional durable store shared across sessions that keeps
//! entries for a fixed window (20 minutes by default) so they can be
//! downloaded again after a reload. The durable tier is a capability: when
//! it cannot be opened, or a write fails, the cache keeps working from
//! memory.

mod result_cache;
mod sqlite;
mod store;
mod sweeper;
mod types;

pub use result_cache::{purge_expired_entries, ResultCache};
pub use sqlite::SqliteResultStore;
pub use store::DurableStore;
pub use sweeper::CacheSweeper;
pub use types::{CacheEntry, IndexRecord, SessionId, StoreError};

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CacheConfig;

/// Open the durable tier described by `config`, or `None` to run from
/// memory only.
pub fn open_durable_store(config: &CacheConfig) -> Option<Arc<dyn DurableStore>> {
    if !config.durable {
        info!("Durable result cache disabled");
        return None;
    }

    if let Some(parent) = config.database_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(
                path = %parent.display(),
                error = %e,
                "Cannot create cache directory, caching in memory only"
            );
            return None;
        }
    }

    match SqliteResultStore::new(&config.database_path) {
        Ok(store) => {
            info!(path = %config.database_path.display(), "Opened durable result cache");
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(
                path = %config.database_path.display(),
                error = %e,
                "Cannot open durable result cache, caching in memory only"
            );
            None
        }
    }
}
