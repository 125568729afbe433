//! The 256-bit symmetric key type.
//!
//! `SymmetricKey` is used for both the derivation-path key produced during
//! setup and the session key held while the vault is unlocked. Its bytes
//! are wiped when the value is dropped.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, VaultError};

/// Length of a symmetric key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte key that zeroes its memory when dropped.
///
/// Not `Clone`. A second copy of the session key only ever comes from
/// reloading it from the secret store.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a byte slice loaded from storage.
    ///
    /// Fails with `InvalidInput` unless the slice is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::InvalidInput(format!(
                "key must be {KEY_LEN} bytes (got {})",
                bytes.len()
            ))
        })?;
        Ok(Self::new(arr))
    }

    /// Access the raw key bytes (e.g. to persist them or build a cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Compare two keys without leaking the position of the first mismatch.
    pub fn ct_eq(&self, other: &SymmetricKey) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            SymmetricKey::from_slice(&[1u8; 31]),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(SymmetricKey::from_slice(&[1u8; 32]).is_ok());
    }

    #[test]
    fn ct_eq_compares_bytes() {
        let a = SymmetricKey::new([7u8; KEY_LEN]);
        let b = SymmetricKey::new([7u8; KEY_LEN]);
        let c = SymmetricKey::new([8u8; KEY_LEN]);
        assert!(a.ct_eq(&b));
        assert!(!a.ct_eq(&c));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let key = SymmetricKey::new([0x41u8; KEY_LEN]);
        let shown = format!("{key:?}");
        assert!(!shown.contains("65"));
        assert!(shown.contains("redacted"));
    }
}
