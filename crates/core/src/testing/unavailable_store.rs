//! Durable store that is never available.

use crate::cache::{CacheEntry, DurableStore, IndexRecord, SessionId, StoreError};

/// Fails every call, like an environment without durable storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable(
        "durable storage is not available".to_string(),
    ))
}

impl DurableStore for UnavailableStore {
    fn put(&self, _entry: &CacheEntry) -> Result<(), StoreError> {
        unavailable()
    }

    fn get(&self, _id: &str) -> Result<Option<CacheEntry>, StoreError> {
        unavailable()
    }

    fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        unavailable()
    }

    fn scan_by_created_at(&self) -> Result<Vec<IndexRecord>, StoreError> {
        unavailable()
    }

    fn scan_by_session(&self, _session_id: &SessionId) -> Result<Vec<IndexRecord>, StoreError> {
        unavailable()
    }
}
