//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` draws a fresh random 12-byte nonce from the OS
//! and returns it alongside the ciphertext. The 16-byte authentication tag
//! is appended to the ciphertext:
//!
//!   ciphertext = [ encrypted bytes | 16-byte auth tag ]
//!
//! The nonce travels separately so the item store can keep it in its own
//! column.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use super::keys::SymmetricKey;
use super::random::generate_nonce;
use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of one `encrypt` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Encrypted bytes with the auth tag appended.
    pub ciphertext: Vec<u8>,
    /// The nonce this payload was sealed under.
    pub nonce: [u8; NONCE_LEN],
}

impl EncryptedPayload {
    /// The trailing authentication tag.
    pub fn auth_tag(&self) -> &[u8] {
        let split = self.ciphertext.len().saturating_sub(TAG_LEN);
        &self.ciphertext[split..]
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Empty plaintext is rejected: the vault never stores empty payloads.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<EncryptedPayload> {
    if plaintext.is_empty() {
        return Err(VaultError::InvalidInput("plaintext cannot be empty".into()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = generate_nonce()?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(EncryptedPayload { ciphertext, nonce })
}

/// Decrypt `ciphertext` (with its appended tag) sealed under `nonce`.
///
/// Inputs shorter than a tag fail with `InvalidCiphertext` before the
/// cipher runs. Every authentication failure maps to `DecryptionFailed`,
/// so a wrong key and a tampered payload look identical to the caller.
pub fn decrypt(ciphertext: &[u8], nonce: &[u8; NONCE_LEN], key: &SymmetricKey) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_LEN {
        return Err(VaultError::InvalidCiphertext);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| VaultError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciphertext_carries_a_sixteen_byte_tag() {
        let key = SymmetricKey::new([3u8; 32]);
        let payload = encrypt(b"abc", &key).unwrap();
        assert_eq!(payload.ciphertext.len(), 3 + TAG_LEN);
        assert_eq!(payload.auth_tag().len(), TAG_LEN);
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        let key = SymmetricKey::new([3u8; 32]);
        assert!(matches!(
            encrypt(b"", &key),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn bare_tag_with_wrong_key_is_decryption_failure() {
        // Exactly TAG_LEN bytes is structurally valid (empty message).
        let key = SymmetricKey::new([3u8; 32]);
        let err = decrypt(&[0u8; TAG_LEN], &[1u8; NONCE_LEN], &key).unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }
}
