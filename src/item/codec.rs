//! The structured item carried inside an encrypted record.
//!
//! The plaintext buffer is the item serialized as compact JSON. The core
//! only promises that `decode_item(encode_item(x)) == x` and that the
//! buffer survives `decrypt(encrypt(buf))` byte for byte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::record::ItemId;
use crate::errors::{Result, VaultError};

/// What kind of credential an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    #[default]
    Login,
    Card,
    SecureNote,
    Identity,
    Wifi,
    Other,
}

/// A decrypted vault item. String fields are wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct VaultItem {
    pub title: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    #[zeroize(skip)]
    pub category: Category,
    pub is_pinned: bool,
    pub is_favourite: bool,
}

/// An item together with the record metadata it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedItem {
    pub id: ItemId,
    pub item: VaultItem,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serialize an item into the plaintext buffer that gets encrypted.
pub fn encode_item(item: &VaultItem) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::to_vec(item)
        .map(Zeroizing::new)
        .map_err(|e| VaultError::SerializationError(format!("item: {e}")))
}

/// Parse a decrypted plaintext buffer back into an item.
pub fn decode_item(plaintext: &[u8]) -> Result<VaultItem> {
    serde_json::from_slice(plaintext)
        .map_err(|e| VaultError::SerializationError(format!("item: {e}")))
}
