//! In-memory `ItemStore`, used by tests and by hosts that persist records
//! themselves.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::record::{ItemId, ItemRecord, ItemStore};
use crate::errors::{Result, VaultError};

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    records: RwLock<HashMap<ItemId, ItemRecord>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ItemStore for MemoryItemStore {
    fn insert(&self, record: ItemRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(VaultError::ItemStore(format!(
                "item {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    fn update(&self, record: ItemRecord) -> Result<()> {
        let mut records = self.records.write();
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(VaultError::ItemNotFound(record.id)),
        }
    }

    fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn all(&self) -> Result<Vec<ItemRecord>> {
        let mut list: Vec<ItemRecord> = self.records.read().values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    fn remove(&self, id: &ItemId) -> Result<bool> {
        Ok(self.records.write().remove(id).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.records.write().clear();
        Ok(())
    }
}
