//! In-memory lock store.

use crate::error::StoreError;
use crate::types::{LockRecord, NewLock};
use crate::LockStore;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    records: HashMap<String, LockRecord>,
    last_id: i64,
}

/// Lock store that keeps records in process memory only.
///
/// Enforces the same secret uniqueness as the SQLite store. Everything is
/// lost when the process exits.
#[derive(Default)]
pub struct MemoryLockStore {
    inner: RwLock<Inner>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn copy_record(record: &LockRecord) -> LockRecord {
    LockRecord {
        id: record.id,
        secret: record.secret.clone(),
        unlock_at: record.unlock_at,
        created_at: record.created_at,
        private_key: SecretString::new(record.private_key.expose_secret().clone()),
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn insert(&self, lock: NewLock) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&lock.secret) {
            return Err(StoreError::ConstraintViolation(
                "UNIQUE constraint failed: locks.secret".into(),
            ));
        }

        inner.last_id += 1;
        let id = inner.last_id;
        inner.records.insert(
            lock.secret.clone(),
            LockRecord {
                id,
                secret: lock.secret,
                unlock_at: lock.unlock_at,
                created_at: lock.created_at,
                private_key: lock.private_key,
            },
        );

        debug!(id, "Memory store: inserted lock");
        Ok(id)
    }

    async fn find_by_secret(&self, secret: &str) -> Result<Option<LockRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(secret).map(copy_record))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_lock(secret: &str) -> NewLock {
        NewLock {
            secret: secret.into(),
            unlock_at: 2_000,
            created_at: 1_000,
            private_key: SecretString::new("pem".into()),
        }
    }

    #[tokio::test]
    async fn test_memory_store_insert_and_find() {
        let store = MemoryLockStore::new();
        let id = store.insert(new_lock("one")).await.unwrap();

        let record = store.find_by_secret("one").await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.private_key.expose_secret(), "pem");
        assert!(store.find_by_secret("two").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate_secret() {
        let store = MemoryLockStore::new();
        store.insert(new_lock("one")).await.unwrap();

        let err = store.insert(new_lock("one")).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_assigns_sequential_ids() {
        let store = MemoryLockStore::new();
        assert_eq!(store.insert(new_lock("a")).await.unwrap(), 1);
        assert_eq!(store.insert(new_lock("b")).await.unwrap(), 2);
    }
}
