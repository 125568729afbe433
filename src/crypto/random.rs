//! Cryptographically secure random bytes from the OS entropy source.
//!
//! Every helper here reads from `OsRng` and fails hard when the source is
//! unavailable. There is no fallback generator and no retry.

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::errors::{Result, VaultError};

/// Length of the master-password salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Fill a fresh buffer of `count` bytes from the OS entropy source.
pub fn generate_random_bytes(count: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    fill(&mut buf)?;
    Ok(buf)
}

/// Generate a random 32-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill(&mut salt)?;
    Ok(salt)
}

/// Generate a random 96-bit AES-GCM nonce.
pub fn generate_nonce() -> Result<[u8; crate::crypto::NONCE_LEN]> {
    let mut nonce = [0u8; crate::crypto::NONCE_LEN];
    fill(&mut nonce)?;
    Ok(nonce)
}

fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| VaultError::EntropyUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(generate_random_bytes(0).unwrap().len(), 0);
        assert_eq!(generate_random_bytes(48).unwrap().len(), 48);
    }

    #[test]
    fn salts_are_not_repeated() {
        let a = generate_salt().unwrap();
        let b = generate_salt().unwrap();
        assert_ne!(a, b);
        assert_ne!(a, [0u8; SALT_LEN], "salt must never be all zeros");
    }

    #[test]
    fn nonces_are_not_zero_initialized() {
        let n = generate_nonce().unwrap();
        assert_ne!(n, [0u8; crate::crypto::NONCE_LEN]);
    }
}
