use thiserror::Error;

use crate::biometric::BiometricError;
use crate::item::ItemId;

/// All errors that can occur in the PocketVault core.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Input errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Crypto errors ---
    #[error("Ciphertext is malformed (shorter than the authentication tag)")]
    InvalidCiphertext,

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("OS entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    // --- Secret store errors ---
    #[error("Secret '{0}' not found")]
    NotFound(String),

    #[error("Secret '{0}' has an unexpected format")]
    UnexpectedFormat(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    // --- Biometric errors ---
    #[error("Authentication failed: {0}")]
    Biometric(#[from] BiometricError),

    // --- Session errors ---
    #[error("No active session, unlock the vault first")]
    NoActiveSession,

    #[error("Vault has not been set up")]
    NotInitialized,

    #[error("Vault is already set up")]
    AlreadyInitialized,

    #[error("A session for service '{0}' is already active in this process")]
    SessionAlreadyActive(String),

    #[error("Master password does not match")]
    PasswordMismatch,

    // --- Item store errors ---
    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Item store error: {0}")]
    ItemStore(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl VaultError {
    /// Returns `true` for failures the user can resolve by calling
    /// `unlock()` again (a cancelled or failed prompt).
    pub fn is_retryable(&self) -> bool {
        matches!(self, VaultError::Biometric(e) if e.is_retryable())
    }
}

/// Convenience type alias for PocketVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
