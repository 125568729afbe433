//! Persistence for the two vault secrets: the KDF salt and the raw
//! session-key bytes.
//!
//! Backends must keep entries on this device only, readable only while the
//! device is unlocked, and out of every backup or migration transfer. The
//! plaintext master password is never written here.
//!
//! - `MemorySecretStore`: in-process map, for tests and ephemeral vaults.
//! - `KeyringSecretStore`: the OS credential store (feature `keyring-store`).

pub mod memory;
#[cfg(feature = "keyring-store")]
pub mod keyring;

pub use memory::MemorySecretStore;
#[cfg(feature = "keyring-store")]
pub use self::keyring::KeyringSecretStore;

use crate::errors::Result;

/// Entry id of the 32-byte KDF salt.
pub const SALT_ID: &str = "master.salt";

/// Entry id of the 32-byte session key.
pub const KEY_ID: &str = "vault.key";

/// Key-value access to an OS-protected credential store.
///
/// Calls may block on the platform API. A write interrupted by process
/// teardown is left to the platform's own atomicity.
pub trait SecretStore: Send + Sync {
    /// Insert or overwrite the entry `id`.
    fn save(&self, bytes: &[u8], id: &str) -> Result<()>;

    /// Read the entry `id`.
    ///
    /// Fails with `NotFound` when absent and `UnexpectedFormat` when the
    /// stored value cannot be read back as raw bytes.
    fn load(&self, id: &str) -> Result<Vec<u8>>;

    /// Whether the entry `id` is present. Backend errors read as `false`.
    fn exists(&self, id: &str) -> bool;

    /// Remove the entry `id`. Succeeds whether or not it existed.
    fn delete(&self, id: &str) -> Result<()>;
}
