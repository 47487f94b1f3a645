//! Configuration for the time-lock service.

use crate::engine::MAX_LOCK_SECONDS;
use crate::keys::MIN_RSA_BITS;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable prefix, e.g. `TIMELOCK_SERVER__PORT`.
const ENV_PREFIX: &str = "TIMELOCK";

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Lock storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Key generation configuration
    #[serde(default)]
    pub keys: KeysConfig,

    /// Allowed lock durations
    #[serde(default)]
    pub locks: LocksConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite lock database
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, locks are kept in memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    /// RSA modulus size in bits
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocksConfig {
    /// Shortest allowed lock, in seconds
    #[serde(default = "default_min_seconds")]
    pub min_seconds: u64,

    /// Longest allowed lock, in seconds
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Lock creations per caller per minute
    #[serde(default = "default_create_rpm")]
    pub create_per_minute: u32,

    /// Info and release requests per caller per minute
    #[serde(default = "default_query_rpm")]
    pub query_per_minute: u32,

    /// Identify callers by the first X-Forwarded-For entry
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// How often idle caller entries are dropped
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            persist: true,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            rsa_bits: default_rsa_bits(),
        }
    }
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            min_seconds: default_min_seconds(),
            max_seconds: default_max_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create_per_minute: default_create_rpm(),
            query_per_minute: default_query_rpm(),
            trust_forwarded_for: false,
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("locks.db")
}

fn default_true() -> bool {
    true
}

fn default_rsa_bits() -> usize {
    MIN_RSA_BITS
}

fn default_min_seconds() -> u64 {
    60
}

// One year
fn default_max_seconds() -> u64 {
    31_556_926
}

fn default_create_rpm() -> u32 {
    20
}

fn default_query_rpm() -> u32 {
    60
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would weaken or break the service.
    pub fn validate(&self) -> Result<()> {
        if self.keys.rsa_bits < MIN_RSA_BITS {
            bail!(
                "keys.rsa_bits must be at least {}, got {}",
                MIN_RSA_BITS,
                self.keys.rsa_bits
            );
        }
        if self.locks.min_seconds == 0 {
            bail!("locks.min_seconds must be greater than zero");
        }
        if self.locks.max_seconds > MAX_LOCK_SECONDS {
            bail!(
                "locks.max_seconds must be at most {}, got {}",
                MAX_LOCK_SECONDS,
                self.locks.max_seconds
            );
        }
        if self.locks.max_seconds <= self.locks.min_seconds {
            bail!(
                "locks.max_seconds ({}) must be greater than locks.min_seconds ({})",
                self.locks.max_seconds,
                self.locks.min_seconds
            );
        }
        if self.rate_limit.create_per_minute == 0 || self.rate_limit.query_per_minute == 0 {
            bail!("rate limit quotas must be greater than zero");
        }
        Ok(())
    }
}
