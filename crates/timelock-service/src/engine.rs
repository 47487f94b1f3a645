//! Lock lifecycle: creation, status queries and time-gated key release.
//!
//! A lock has no stored state besides its immutable record. Whether it is
//! still closed is decided on every call by comparing the current time with
//! the stored `unlock_at`.

use crate::clock::{Clock, SystemClock};
use crate::config::LocksConfig;
use crate::error::LockError;
use crate::keys::KeyGenerator;
use crate::secret::{RandomSecretAllocator, SecretAllocator};
use lock_store::{LockRecord, LockStore, NewLock};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Insert attempts before a secret collision is reported.
pub const MAX_INSERT_ATTEMPTS: usize = 3;

/// Upper limit for a configured lock duration: one hundred years.
pub const MAX_LOCK_SECONDS: u64 = 100 * 31_556_926;

/// Inclusive bounds on the lock duration, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPolicy {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        LocksConfig::default().into()
    }
}

impl From<LocksConfig> for DurationPolicy {
    fn from(config: LocksConfig) -> Self {
        Self {
            min_seconds: config.min_seconds,
            max_seconds: config.max_seconds,
        }
    }
}

impl DurationPolicy {
    /// Parse and range-check a requested duration.
    pub fn validate(&self, raw: Option<&str>) -> Result<u64, LockError> {
        let raw = raw.ok_or(LockError::MissingParameter("time"))?;

        match raw.trim().parse::<u64>() {
            Ok(seconds) if (self.min_seconds..=self.max_seconds).contains(&seconds) => Ok(seconds),
            _ => Err(self.invalid()),
        }
    }

    fn invalid(&self) -> LockError {
        LockError::InvalidDuration {
            min: self.min_seconds,
            max: self.max_seconds,
        }
    }

    /// Unlock time for a lock created at `created_at` that stays closed for
    /// `seconds`. Overflow is reported as an invalid duration, never wrapped.
    pub fn unlock_at(&self, created_at: i64, seconds: u64) -> Result<i64, LockError> {
        i64::try_from(seconds)
            .ok()
            .and_then(|s| s.checked_mul(1000))
            .and_then(|ms| created_at.checked_add(ms))
            .ok_or_else(|| self.invalid())
    }
}

/// Result of a successful creation. Never carries the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLock {
    pub secret: String,
    pub public_key: String,
    pub unlock_at: i64,
}

/// Status of an existing lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    pub created_at: i64,
    pub locked: bool,
    pub remaining_ms: i64,
}

/// Outcome of a release request.
#[derive(Debug)]
pub enum Release {
    /// The unlock time has passed.
    Unlocked { private_key: SecretString },
    /// Still closed; the key is not part of this variant.
    Locked { remaining_ms: i64 },
}

/// Milliseconds to fractional seconds, as reported to callers.
pub fn ms_to_seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

fn secret_prefix(secret: &str) -> &str {
    secret.get(..8).unwrap_or(secret)
}

/// Orchestrates the key generator, secret allocator and store.
#[derive(Clone)]
pub struct LockEngine {
    store: Arc<dyn LockStore>,
    keys: Arc<dyn KeyGenerator>,
    secrets: Arc<dyn SecretAllocator>,
    clock: Arc<dyn Clock>,
    policy: DurationPolicy,
}

impl LockEngine {
    /// Create an engine using the system clock and random secrets.
    pub fn new(
        store: Arc<dyn LockStore>,
        keys: Arc<dyn KeyGenerator>,
        policy: DurationPolicy,
    ) -> Self {
        Self {
            store,
            keys,
            secrets: Arc::new(RandomSecretAllocator),
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretAllocator>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    /// Create a lock that opens `time` seconds from now.
    ///
    /// Nothing is written unless key generation succeeds. A secret collision
    /// is retried with a fresh secret.
    #[instrument(skip(self))]
    pub async fn create(&self, time: Option<&str>) -> Result<CreatedLock, LockError> {
        let seconds = self.policy.validate(time)?;
        // Reject unrepresentable unlock times before key generation
        self.policy.unlock_at(self.clock.now_ms(), seconds)?;

        let pair = self.keys.generate().await?;

        let created_at = self.clock.now_ms();
        let unlock_at = self.policy.unlock_at(created_at, seconds)?;

        let mut attempt = 1;
        let secret = loop {
            let secret = self.secrets.allocate();
            let lock = NewLock {
                secret: secret.clone(),
                unlock_at,
                created_at,
                private_key: SecretString::new(pair.private_key.expose_secret().clone()),
            };

            match self.store.insert(lock).await {
                Ok(id) => {
                    info!(id, secret = secret_prefix(&secret), unlock_at, "Lock created");
                    break secret;
                }
                Err(lock_store::StoreError::ConstraintViolation(msg))
                    if attempt < MAX_INSERT_ATTEMPTS =>
                {
                    warn!(attempt, "Secret collision, retrying with a new secret: {}", msg);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(CreatedLock {
            secret,
            public_key: pair.public_key,
            unlock_at,
        })
    }

    /// Report whether a lock is still closed and for how long.
    pub async fn info(&self, secret: Option<&str>) -> Result<LockStatus, LockError> {
        let record = self.lookup(secret).await?;
        let now = self.clock.now_ms();

        Ok(LockStatus {
            created_at: record.created_at,
            locked: record.is_locked(now),
            remaining_ms: record.remaining_ms(now),
        })
    }

    /// Hand out the private key if the unlock time has passed.
    pub async fn release(&self, secret: Option<&str>) -> Result<Release, LockError> {
        let record = self.lookup(secret).await?;
        let now = self.clock.now_ms();

        if record.is_locked(now) {
            return Ok(Release::Locked {
                remaining_ms: record.remaining_ms(now),
            });
        }

        info!(secret = secret_prefix(&record.secret), "Lock released");
        Ok(Release::Unlocked {
            private_key: record.private_key,
        })
    }

    /// Number of locks in the store.
    pub async fn lock_count(&self) -> Result<u64, LockError> {
        Ok(self.store.count().await?)
    }

    async fn lookup(&self, secret: Option<&str>) -> Result<LockRecord, LockError> {
        let secret = secret.ok_or(LockError::MissingParameter("id"))?;
        self.store
            .find_by_secret(secret)
            .await?
            .ok_or(LockError::NotFound)
    }
}
