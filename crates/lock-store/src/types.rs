//! Lock record types.

use secrecy::SecretString;

/// A persisted time-lock.
///
/// Records are append-only: nothing in this crate updates or deletes one
/// after it has been inserted.
#[derive(Debug)]
pub struct LockRecord {
    /// Row identifier assigned by the store
    pub id: i64,

    /// Public bearer handle for the lock
    pub secret: String,

    /// Milliseconds since the Unix epoch after which the key may be released
    pub unlock_at: i64,

    /// Milliseconds since the Unix epoch when the lock was created
    pub created_at: i64,

    /// PEM-encoded private key withheld until `unlock_at`
    pub private_key: SecretString,
}

impl LockRecord {
    /// Milliseconds left until the lock opens, never negative.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.unlock_at - now_ms).max(0)
    }

    /// Whether the lock is still closed at `now_ms`.
    pub fn is_locked(&self, now_ms: i64) -> bool {
        self.unlock_at > now_ms
    }
}

/// A lock about to be inserted. The store assigns the id.
#[derive(Debug)]
pub struct NewLock {
    pub secret: String,
    pub unlock_at: i64,
    pub created_at: i64,
    pub private_key: SecretString,
}
