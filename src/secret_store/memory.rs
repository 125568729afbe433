//! In-memory `SecretStore`.
//!
//! Mirrors the behavior of platform keychains closely enough to test the
//! session flows against: inserts reject duplicates (so `save` must fall
//! through to an update), values are kept as base64 text, and the whole
//! store can be made to fail on demand.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use super::SecretStore;
use crate::errors::{Result, VaultError};

/// Outcome of the raw insert primitive.
enum Insert {
    Added,
    Duplicate,
}

#[derive(Default)]
pub struct MemorySecretStore {
    service: String,
    entries: Mutex<HashMap<String, Zeroizing<String>>>,
    fail_writes: Mutex<bool>,
}

impl MemorySecretStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            ..Self::default()
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Make every subsequent `save` fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Overwrite an entry with arbitrary text, bypassing encoding.
    pub fn put_raw(&self, id: &str, value: &str) {
        self.entries
            .lock()
            .insert(id.to_string(), Zeroizing::new(value.to_string()));
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn insert(&self, id: &str, value: Zeroizing<String>) -> Insert {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Insert::Duplicate;
        }
        entries.insert(id.to_string(), value);
        Insert::Added
    }

    fn update(&self, id: &str, value: Zeroizing<String>) -> Result<()> {
        match self.entries.lock().get_mut(id) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VaultError::NotFound(id.to_string())),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn save(&self, bytes: &[u8], id: &str) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(VaultError::SecretStore(format!(
                "write to '{id}' rejected by backend"
            )));
        }

        let encoded = Zeroizing::new(BASE64.encode(bytes));
        match self.insert(id, encoded.clone()) {
            Insert::Added => {}
            Insert::Duplicate => self.update(id, encoded)?,
        }
        tracing::debug!(service = %self.service, id, "secret saved");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>> {
        let entries = self.entries.lock();
        let encoded = entries
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|_| VaultError::UnexpectedFormat(id.to_string()))
    }

    fn exists(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.entries.lock().remove(id).is_some() {
            tracing::debug!(service = %self.service, id, "secret deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_overwrites_existing_entry() {
        let store = MemorySecretStore::new("test");
        store.save(&[1, 2, 3], "k").unwrap();
        store.save(&[4, 5], "k").unwrap();
        assert_eq!(store.load("k").unwrap(), vec![4, 5]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_missing_is_not_found() {
        let store = MemorySecretStore::new("test");
        assert!(matches!(store.load("nope"), Err(VaultError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn load_corrupt_is_unexpected_format() {
        let store = MemorySecretStore::new("test");
        store.put_raw("k", "%%% not base64 %%%");
        assert!(matches!(
            store.load("k"),
            Err(VaultError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemorySecretStore::new("test");
        store.save(b"x", "k").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(!store.exists("k"));
    }

    #[test]
    fn failing_backend_rejects_writes() {
        let store = MemorySecretStore::new("test");
        store.set_fail_writes(true);
        assert!(matches!(
            store.save(b"x", "k"),
            Err(VaultError::SecretStore(_))
        ));
        assert!(store.is_empty());
    }
}
