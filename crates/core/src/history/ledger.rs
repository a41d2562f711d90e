//! Bounded, newest-first log of completed jobs.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::HistoryEntry;
use crate::cache::ResultCache;
use crate::clock::{is_expired, Clock};

/// History of one session.
///
/// Entries older than the cache TTL are dropped when the ledger is listed,
/// so the ledger never advertises more than the cache can still serve.
pub struct HistoryLedger {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: usize,
    cache: Arc<ResultCache>,
    clock: Arc<dyn Clock>,
}

impl HistoryLedger {
    pub fn new(cache: Arc<ResultCache>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity,
            cache,
            clock,
        }
    }

    /// Record a completed job. The oldest entry is dropped once full.
    pub async fn append(&self, entry: HistoryEntry) {
        let mut entries = self.entries.write().await;
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Live entries, newest first.
    pub async fn list(&self) -> Vec<HistoryEntry> {
        let now = self.clock.now();
        let ttl = self.cache.ttl();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| !is_expired(entry.at, now, ttl));
        if entries.len() != before {
            debug!(dropped = before - entries.len(), "Dropped expired history entries");
        }
        entries.iter().cloned().collect()
    }

    /// Forget the history and delete this session's cached artifacts.
    /// Returns how many cache entries were removed.
    pub async fn clear(&self) -> usize {
        self.entries.write().await.clear();
        let session_id = self.cache.session_id().clone();
        self.cache.delete_all_for_session(&session_id).await
    }

    /// Start from previously saved entries, newest first.
    pub fn with_entries(mut self, entries: Vec<HistoryEntry>) -> Self {
        self.entries = RwLock::new(entries.into_iter().take(self.capacity).collect());
        self
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
