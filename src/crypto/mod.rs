//! Cryptographic primitives for PocketVault.
//!
//! This module provides:
//! - OS-entropy random bytes, salts and nonces (`random`)
//! - HKDF-SHA256 / Argon2id master-password key derivation (`kdf`)
//! - The zeroizing `SymmetricKey` wrapper (`keys`)
//! - AES-256-GCM encryption and decryption (`encryption`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, EncryptedPayload, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, derive_key_with_params, Argon2Params, KdfParams};
pub use keys::{SymmetricKey, KEY_LEN};
pub use random::{generate_nonce, generate_random_bytes, generate_salt, SALT_LEN};
