//! Durable tier trait definition.

use super::types::{CacheEntry, IndexRecord, SessionId, StoreError};

/// Persistent key-value store for cache entries.
///
/// Keys are job ids, so writes to the same key are last-write-wins.
/// Implementations are synchronous; the cache calls them off the async
/// runtime.
pub trait DurableStore: Send + Sync {
    /// Insert or replace an entry.
    fn put(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Fetch an entry by id, whatever its session.
    fn get(&self, id: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Remove an entry. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Every entry ordered by creation time, oldest first.
    fn scan_by_created_at(&self) -> Result<Vec<IndexRecord>, StoreError>;

    /// Every entry belonging to `session_id`.
    fn scan_by_session(&self, session_id: &SessionId) -> Result<Vec<IndexRecord>, StoreError>;

    /// Remove several entries, returning how many existed.
    fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for id in ids {
            if self.delete(id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
