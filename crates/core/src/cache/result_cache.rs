//! Two-tier result cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::store::DurableStore;
use super::types::{CacheEntry, SessionId, StoreError};
use crate::clock::{is_expired, Clock};
use crate::metrics::{CACHE_LOOKUPS, CACHE_PUTS, CACHE_PURGED};

async fn blocking<T, F>(store: &Arc<dyn DurableStore>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn DurableStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
}

/// Remove every durable entry older than `ttl`.
///
/// The index is scanned oldest first and the scan stops at the first entry
/// still inside the window. The store orders by `created_at` itself, so
/// nothing expired can follow a live entry.
pub async fn purge_expired_entries(
    store: &Arc<dyn DurableStore>,
    clock: &dyn Clock,
    ttl: Duration,
) -> Result<usize, StoreError> {
    let (removed, _) = purge_durable(store, clock, ttl).await?;
    Ok(removed)
}

/// Returns the delete count together with the ids that were swept.
async fn purge_durable(
    store: &Arc<dyn DurableStore>,
    clock: &dyn Clock,
    ttl: Duration,
) -> Result<(usize, Vec<String>), StoreError> {
    let now = clock.now();
    let index = blocking(store, |s| s.scan_by_created_at()).await?;
    let expired: Vec<String> = index
        .into_iter()
        .take_while(|record| is_expired(record.created_at, now, ttl))
        .map(|record| record.id)
        .collect();
    if expired.is_empty() {
        return Ok((0, expired));
    }

    let ids = expired.clone();
    let removed = blocking(store, move |s| s.delete_many(&ids)).await?;
    CACHE_PURGED.inc_by(removed as u64);
    Ok((removed, expired))
}

/// Artifact cache of one session.
///
/// The memory tier lives as long as this value and never fails. The
/// optional durable tier is shared between sessions and outlives them, but
/// only hands entries back to the session that wrote them. Both tiers apply
/// the TTL on lookup.
pub struct ResultCache {
    session_id: SessionId,
    memory: RwLock<HashMap<String, CacheEntry>>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(
        session_id: SessionId,
        durable: Option<Arc<dyn DurableStore>>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            session_id,
            memory: RwLock::new(HashMap::new()),
            durable,
            clock,
            ttl,
        }
    }

    /// Cache without a durable tier.
    pub fn memory_only(session_id: SessionId, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self::new(session_id, None, clock, ttl)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn has_durable_tier(&self) -> bool {
        self.durable.is_some()
    }

    /// Entries held in memory, expired ones included.
    pub async fn memory_len(&self) -> usize {
        self.memory.read().await.len()
    }

    /// Store `entry` in both tiers. Returns whether the durable write
    /// succeeded; the memory tier always takes the entry.
    pub async fn put(&self, entry: CacheEntry) -> bool {
        let id = entry.id.clone();
        self.memory.write().await.insert(id.clone(), entry.clone());
        CACHE_PUTS.with_label_values(&["memory", "stored"]).inc();

        let Some(store) = &self.durable else {
            CACHE_PUTS.with_label_values(&["durable", "skipped"]).inc();
            return false;
        };
        match blocking(store, move |s| s.put(&entry)).await {
            Ok(()) => {
                CACHE_PUTS.with_label_values(&["durable", "stored"]).inc();
                debug!(id = %id, session_id = %self.session_id, "Cached result");
                true
            }
            Err(err) => {
                CACHE_PUTS.with_label_values(&["durable", "failed"]).inc();
                warn!(
                    id = %id,
                    error = %err,
                    "Durable cache write failed, keeping memory copy only"
                );
                false
            }
        }
    }

    /// Look up `id` for this session.
    ///
    /// Expired entries and entries written by another session are reported
    /// as missing. An expired entry is dropped from the tier it was found in.
    pub async fn get(&self, id: &str) -> Option<CacheEntry> {
        let now = self.clock.now();

        let cached = self
            .memory
            .read()
            .await
            .get(id)
            .filter(|entry| entry.session_id == self.session_id)
            .cloned();
        if let Some(entry) = cached {
            if is_expired(entry.created_at, now, self.ttl) {
                CACHE_LOOKUPS.with_label_values(&["expired"]).inc();
                self.memory.write().await.remove(id);
                return None;
            }
            CACHE_LOOKUPS.with_label_values(&["memory"]).inc();
            return Some(entry);
        }

        let store = self.durable.as_ref()?;
        let key = id.to_string();
        let entry = match blocking(store, move |s| s.get(&key)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                CACHE_LOOKUPS.with_label_values(&["missing"]).inc();
                return None;
            }
            Err(err) => {
                warn!(id = %id, error = %err, "Durable cache read failed");
                CACHE_LOOKUPS.with_label_values(&["missing"]).inc();
                return None;
            }
        };

        if entry.session_id != self.session_id {
            CACHE_LOOKUPS.with_label_values(&["foreign"]).inc();
            return None;
        }
        if is_expired(entry.created_at, now, self.ttl) {
            CACHE_LOOKUPS.with_label_values(&["expired"]).inc();
            let key = id.to_string();
            if let Err(err) = blocking(store, move |s| s.delete(&key)).await {
                warn!(id = %id, error = %err, "Failed to drop expired entry");
            }
            return None;
        }

        CACHE_LOOKUPS.with_label_values(&["durable"]).inc();
        Some(entry)
    }

    /// Sweep both tiers. Returns the number of distinct entries removed.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let mut removed: HashSet<String> = HashSet::new();
        self.memory.write().await.retain(|id, entry| {
            if is_expired(entry.created_at, now, ttl) {
                removed.insert(id.clone());
                false
            } else {
                true
            }
        });

        if let Some(store) = &self.durable {
            match purge_durable(store, self.clock.as_ref(), ttl).await {
                Ok((_, ids)) => removed.extend(ids),
                Err(err) => warn!(error = %err, "Expiry sweep failed"),
            }
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "Purged expired results");
        }
        removed.len()
    }

    /// Drop every entry of `session_id` from both tiers. Returns the number
    /// of distinct entries removed.
    pub async fn delete_all_for_session(&self, session_id: &SessionId) -> usize {
        let mut removed: HashSet<String> = HashSet::new();
        self.memory.write().await.retain(|id, entry| {
            if entry.session_id == *session_id {
                removed.insert(id.clone());
                false
            } else {
                true
            }
        });

        if let Some(store) = &self.durable {
            let session = session_id.clone();
            let result = blocking(store, move |s| {
                let ids: Vec<String> = s
                    .scan_by_session(&session)?
                    .into_iter()
                    .map(|record| record.id)
                    .collect();
                s.delete_many(&ids)?;
                Ok(ids)
            })
            .await;
            match result {
                Ok(ids) => removed.extend(ids),
                Err(err) => warn!(
                    session_id = %session_id,
                    error = %err,
                    "Failed to delete durable results"
                ),
            }
        }

        debug!(session_id = %session_id, removed = removed.len(), "Deleted session results");
        removed.len()
    }
}
