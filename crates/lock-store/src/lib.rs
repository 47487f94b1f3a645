//! Durable storage for time-lock records.
//!
//! Records are written once when a lock is created and only read afterwards.
//! The SQLite backend survives process restarts; the in-memory backend is for
//! tests and throwaway deployments.

mod error;
mod memory;
mod sqlite;
mod types;

pub use error::StoreError;
pub use memory::MemoryLockStore;
pub use sqlite::SqliteLockStore;
pub use types::{LockRecord, NewLock};

use async_trait::async_trait;

/// Append-only lock storage.
///
/// The uniqueness constraint on `secret` is the only synchronization point:
/// a duplicate insert fails with [`StoreError::ConstraintViolation`] and
/// never overwrites the existing record.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Persist a new lock and return its assigned id.
    async fn insert(&self, lock: NewLock) -> Result<i64, StoreError>;

    /// Look up a lock by its secret.
    async fn find_by_secret(&self, secret: &str) -> Result<Option<LockRecord>, StoreError>;

    /// Number of stored locks.
    async fn count(&self) -> Result<u64, StoreError>;
}
