//! Asymmetric key pair generation.

use crate::error::LockError;
use async_trait::async_trait;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::SecretString;
use tracing::{debug, instrument};

/// Smallest RSA modulus accepted for lock keys.
pub const MIN_RSA_BITS: usize = 2048;

/// A freshly generated key pair, both halves PEM-encoded.
#[derive(Debug)]
pub struct KeyPair {
    /// SPKI PEM public key, returned to the lock creator
    pub public_key: String,
    /// PKCS#8 PEM private key, withheld until the lock opens
    pub private_key: SecretString,
}

/// Generates key pairs for new locks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self) -> Result<KeyPair, LockError>;
}

/// RSA key generator.
///
/// Generation is CPU-bound and runs on the blocking thread pool; the caller
/// awaits the result.
#[derive(Debug, Clone)]
pub struct RsaKeyGenerator {
    bits: usize,
}

impl RsaKeyGenerator {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl Default for RsaKeyGenerator {
    fn default() -> Self {
        Self::new(MIN_RSA_BITS)
    }
}

#[async_trait]
impl KeyGenerator for RsaKeyGenerator {
    #[instrument(skip(self), fields(bits = self.bits))]
    async fn generate(&self) -> Result<KeyPair, LockError> {
        let bits = self.bits;
        let pair = tokio::task::spawn_blocking(move || generate_rsa(bits))
            .await
            .map_err(|e| LockError::KeyGeneration(format!("generation task failed: {}", e)))??;

        debug!("Generated RSA key pair");
        Ok(pair)
    }
}

fn generate_rsa(bits: usize) -> Result<KeyPair, LockError> {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .map_err(|e| LockError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let public_key = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| LockError::KeyGeneration(e.to_string()))?;
    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| LockError::KeyGeneration(e.to_string()))?;

    Ok(KeyPair {
        public_key,
        private_key: SecretString::new(private_pem.as_str().to_owned()),
    })
}
