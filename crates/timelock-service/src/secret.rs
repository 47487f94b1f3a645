//! Bearer secrets that identify locks.

use rand::RngCore;

/// Random bytes per secret (160 bits).
pub const SECRET_BYTES: usize = 20;

/// Produces public lock handles.
///
/// Implementations never consult the store; a collision shows up as a
/// constraint violation on insert.
pub trait SecretAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

/// Hex-encoded secrets drawn from the OS-seeded thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretAllocator;

impl SecretAllocator for RandomSecretAllocator {
    fn allocate(&self) -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_secret_is_40_hex_chars() {
        let secret = RandomSecretAllocator.allocate();
        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secrets_do_not_repeat() {
        let secrets: HashSet<String> = (0..1000).map(|_| RandomSecretAllocator.allocate()).collect();
        assert_eq!(secrets.len(), 1000);
    }
}
