//! Time-lock encryption service.
//!
//! Issues RSA key pairs and withholds the private half until a caller-chosen
//! delay has elapsed:
//! - `create` returns the public key and a bearer secret
//! - `info` reports whether a lock is still closed
//! - `release` returns the private key once the unlock time has passed
//!
//! Locks are persisted in SQLite so they survive restarts.

pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod rate_limit;
pub mod secret;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{CreatedLock, DurationPolicy, LockEngine, LockStatus, Release};
pub use error::LockError;
pub use keys::{KeyGenerator, KeyPair, RsaKeyGenerator};
pub use rate_limit::{Admission, EndpointClass, RateGovernor};
pub use secret::{RandomSecretAllocator, SecretAllocator};
