//! Vault items at the boundary with the storage engine.
//!
//! This module provides:
//! - `ItemId`, `ItemRecord` and the `ItemStore` collaborator trait (`record`)
//! - The structured `VaultItem` and its plaintext encoding (`codec`)
//! - An in-memory store (`memory`) and a SQLite store (`sqlite`)

pub mod codec;
pub mod memory;
pub mod record;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

// Re-export the most commonly used items.
pub use codec::{decode_item, encode_item, Category, DecryptedItem, VaultItem};
pub use memory::MemoryItemStore;
pub use record::{ItemId, ItemRecord, ItemStore};
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteItemStore;
