//! SQLite-backed `ItemStore`.
//!
//! Stores each encrypted record as one row of an `items` table. Only
//! ciphertext, nonce and timestamps ever reach the database.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::record::{ItemId, ItemRecord, ItemStore};
use crate::errors::{Result, VaultError};

/// SQLite-backed item store.
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Open (or create) the item database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| VaultError::ItemStore(format!("open {}: {e}", path.display())))?;
        let store = Self::init(conn)?;

        // Set restrictive permissions on the database (owner-only).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VaultError::ItemStore(format!("open in-memory: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id          TEXT PRIMARY KEY,
                ciphertext  BLOB NOT NULL,
                nonce       BLOB NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )
        .map_err(|e| VaultError::ItemStore(format!("create table: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Map one `items` row into a record.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRecord> {
    let id: String = row.get(0)?;
    let created: String = row.get(3)?;
    let updated: String = row.get(4)?;

    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ItemRecord {
        id: ItemId::from_uuid(id),
        ciphertext: row.get(1)?,
        nonce: row.get(2)?,
        created_at: parse_timestamp(&created, 3)?,
        updated_at: parse_timestamp(&updated, 4)?,
    })
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

impl ItemStore for SqliteItemStore {
    fn insert(&self, record: ItemRecord) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO items (id, ciphertext, nonce, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.to_string(),
                    record.ciphertext,
                    record.nonce,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(|e| VaultError::ItemStore(format!("insert {}: {e}", record.id)))?;
        Ok(())
    }

    fn update(&self, record: ItemRecord) -> Result<()> {
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE items
                 SET ciphertext = ?2, nonce = ?3, created_at = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    record.id.to_string(),
                    record.ciphertext,
                    record.nonce,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(|e| VaultError::ItemStore(format!("update {}: {e}", record.id)))?;

        if changed == 0 {
            return Err(VaultError::ItemNotFound(record.id));
        }
        Ok(())
    }

    fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, ciphertext, nonce, created_at, updated_at
                 FROM items WHERE id = ?1",
                params![id.to_string()],
                row_to_record,
            )
            .optional()
            .map_err(|e| VaultError::ItemStore(format!("get {id}: {e}")))
    }

    fn all(&self) -> Result<Vec<ItemRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, ciphertext, nonce, created_at, updated_at
                 FROM items
                 ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| VaultError::ItemStore(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| VaultError::ItemStore(format!("query exec: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| VaultError::ItemStore(format!("row parse: {e}")))?);
        }
        Ok(records)
    }

    fn remove(&self, id: &ItemId) -> Result<bool> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])
            .map_err(|e| VaultError::ItemStore(format!("delete {id}: {e}")))?;
        Ok(changed > 0)
    }

    fn clear(&self) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM items", [])
            .map_err(|e| VaultError::ItemStore(format!("clear: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> ItemRecord {
        let now = Utc::now();
        ItemRecord {
            id: ItemId::new(),
            ciphertext: vec![0xAB; 40],
            nonce: vec![0x0C; 12],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let rec = record();
        store.insert(rec.clone()).unwrap();

        let back = store.get(&rec.id).unwrap().unwrap();
        assert_eq!(back.ciphertext, rec.ciphertext);
        assert_eq!(back.nonce, rec.nonce);
        assert_eq!(back.created_at, rec.created_at);
    }

    #[test]
    fn update_missing_row_is_item_not_found() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let err = store.update(record()).unwrap_err();
        assert!(matches!(err, VaultError::ItemNotFound(_)));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.db");
        let rec = record();

        {
            let store = SqliteItemStore::open(&path).unwrap();
            store.insert(rec.clone()).unwrap();
        }

        let store = SqliteItemStore::open(&path).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, rec.id);
    }

    #[test]
    fn remove_and_clear() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let a = record();
        store.insert(a.clone()).unwrap();
        store.insert(record()).unwrap();

        assert!(store.remove(&a.id).unwrap());
        assert!(!store.remove(&a.id).unwrap());
        assert_eq!(store.all().unwrap().len(), 1);

        store.clear().unwrap();
        assert!(store.all().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn database_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.db");
        let _store = SqliteItemStore::open(&path).unwrap();

        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }
}
