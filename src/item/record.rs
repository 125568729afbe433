//! Encrypted item records and the store that persists them.
//!
//! A record holds an opaque id, the ciphertext (auth tag appended), the
//! nonce it was sealed under, and creation/update timestamps. Byte fields
//! use custom serde helpers so they serialize as base64 strings in JSON
//! rather than raw byte arrays.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;

/// Opaque identifier of a vault item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one read back from storage).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single encrypted item as the storage engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: ItemId,

    /// Encrypted item bytes with the 16-byte auth tag appended.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// The 12-byte nonce. Kept as raw bytes so a malformed value fails
    /// decryption of this record only.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for encrypted item records.
///
/// Implementations index and persist records; they never see plaintext.
pub trait ItemStore: Send + Sync {
    /// Add a new record. Fails if the id is already present.
    fn insert(&self, record: ItemRecord) -> Result<()>;

    /// Replace an existing record. Fails with `ItemNotFound` if absent.
    fn update(&self, record: ItemRecord) -> Result<()>;

    /// Fetch one record.
    fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>>;

    /// Every record, oldest first.
    fn all(&self) -> Result<Vec<ItemRecord>>;

    /// Remove one record. Returns `false` if it was not present.
    fn remove(&self, id: &ItemId) -> Result<bool>;

    /// Remove every record.
    fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
