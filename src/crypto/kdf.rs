//! Master-password key derivation.
//!
//! The default derivation is a single HKDF-SHA256 extract-and-expand with
//! the password as input keying material, the 32-byte vault salt as the
//! HKDF salt and a fixed application `info` string. HKDF is fast, which
//! makes it weak against offline guessing if the salt and the stored key
//! bytes ever leak together, so Argon2id can be selected instead through
//! `Settings::kdf`. Whichever function is chosen must stay fixed for the
//! lifetime of a vault.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;

use super::keys::{SymmetricKey, KEY_LEN};
use super::random::SALT_LEN;
use crate::errors::{Result, VaultError};

/// Domain-separation string bound into every HKDF derivation.
const HKDF_INFO: &[u8] = b"pocketvault/master-key/v1";

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Which password KDF to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfParams {
    /// HKDF-SHA256 with the fixed application info string.
    #[default]
    HkdfSha256,
    /// Argon2id with explicit cost parameters.
    Argon2id(Argon2Params),
}

/// Derive a 32-byte key from `password` and `salt` with HKDF-SHA256.
///
/// The same password + salt always produce the same key.
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> Result<SymmetricKey> {
    derive_key_with_params(password, salt, &KdfParams::HkdfSha256)
}

/// Derive a 32-byte key with an explicit KDF choice.
pub fn derive_key_with_params(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<SymmetricKey> {
    if password.is_empty() {
        return Err(VaultError::InvalidInput(
            "master password cannot be empty".into(),
        ));
    }

    let mut okm = [0u8; KEY_LEN];
    match params {
        KdfParams::HkdfSha256 => {
            let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), password.as_bytes());
            hk.expand(HKDF_INFO, &mut okm).map_err(|e| {
                VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}"))
            })?;
        }
        KdfParams::Argon2id(argon2_params) => {
            argon2id(password.as_bytes(), salt, argon2_params, &mut okm)?;
        }
    }

    // SymmetricKey takes its own copy; the stack buffer is wiped on return.
    let key = SymmetricKey::new(okm);
    zeroize::Zeroize::zeroize(&mut okm);
    Ok(key)
}

/// Run Argon2id into `out`, enforcing minimum cost parameters.
fn argon2id(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
    out: &mut [u8; KEY_LEN],
) -> Result<()> {
    if argon2_params.memory_kib < MIN_MEMORY_KIB {
        return Err(VaultError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            argon2_params.memory_kib
        )));
    }
    if argon2_params.iterations < 1 {
        return Err(VaultError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if argon2_params.parallelism < 1 {
        return Err(VaultError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password, salt, out)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; SALT_LEN] = [0x5Au8; SALT_LEN];

    #[test]
    fn empty_password_is_invalid_input() {
        let err = derive_key("", &SALT).unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
    }

    #[test]
    fn hkdf_matches_reference_construction() {
        // Independent computation with the same salt, IKM and info.
        let hk = Hkdf::<Sha256>::new(Some(SALT.as_slice()), b"hunter2");
        let mut expected = [0u8; KEY_LEN];
        hk.expand(HKDF_INFO, &mut expected).unwrap();

        let key = derive_key("hunter2", &SALT).unwrap();
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn argon2id_rejects_weak_memory_cost() {
        let params = KdfParams::Argon2id(Argon2Params {
            memory_kib: 1_024,
            ..Argon2Params::default()
        });
        let err = derive_key_with_params("pw", &SALT, &params).unwrap_err();
        assert!(matches!(err, VaultError::KeyDerivationFailed(_)));
    }

    #[test]
    fn argon2id_and_hkdf_disagree() {
        let params = KdfParams::Argon2id(Argon2Params {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        });
        let a = derive_key_with_params("same", &SALT, &params).unwrap();
        let b = derive_key("same", &SALT).unwrap();
        assert!(!a.ct_eq(&b));
    }
}
