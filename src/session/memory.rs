//! In-memory session backend for development and testing.
//!
//! Uses `DashMap` for concurrent access without external locks.

use dashmap::DashMap;

use super::{SessionBackend, SessionRecord, StoreError};

/// In-memory session store.
///
/// Not suitable for production — records are lost on restart and not
/// shared across processes. Use the DynamoDB backend for production.
#[derive(Default)]
pub struct InMemoryBackend {
    store: DashMap<String, SessionRecord>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored (including expired).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl SessionBackend for InMemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.store.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError> {
        self.store.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.remove(key);
        Ok(())
    }

    async fn delete_expired(&self, key: &str, now: i64) -> Result<bool, StoreError> {
        Ok(self
            .store
            .remove_if(key, |_, record| record.is_expired(now))
            .is_some())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
