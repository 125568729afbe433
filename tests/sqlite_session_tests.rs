//! End-to-end session flow over the on-disk SQLite item store.

#![cfg(feature = "sqlite-store")]

use pocketvault::biometric::ScriptedAuthenticator;
use pocketvault::config::Settings;
use pocketvault::item::{ItemStore, SqliteItemStore, VaultItem};
use pocketvault::secret_store::MemorySecretStore;
use pocketvault::VaultSession;
use tempfile::TempDir;

fn settings() -> Settings {
    Settings::for_service(&format!("test.sqlite.{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn items_persist_in_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("items.db");
    let settings = settings();

    let session = VaultSession::new(
        settings.clone(),
        MemorySecretStore::new(&settings.service),
        ScriptedAuthenticator::approving(),
        SqliteItemStore::open(&db_path).unwrap(),
    )
    .unwrap();
    session.setup("sqlite master password").await.unwrap();

    let mut item = VaultItem::default();
    item.title = "Router".to_string();
    item.password = "wpa2-passphrase".to_string();
    let id = session.encrypt_and_store(&item).unwrap();

    let mut edited = item.clone();
    edited.notes = "guest network".to_string();
    session.update_item(id, &edited).unwrap();

    let loaded = session.load_and_decrypt_all().unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].item, edited);

    session.lock();
    session.unlock().await.unwrap();
    assert_eq!(session.get_item(id).unwrap().item.notes, "guest network");
    drop(session);

    // The record outlives the session, still encrypted.
    let reopened = SqliteItemStore::open(&db_path).unwrap();
    let records = reopened.all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert!(records[0].created_at <= records[0].updated_at);
    let needle = b"wpa2-passphrase";
    assert!(!records[0]
        .ciphertext
        .windows(needle.len())
        .any(|window| window == needle));
}

#[tokio::test]
async fn reset_clears_sqlite_table() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("items.db");
    let settings = settings();

    let session = VaultSession::new(
        settings.clone(),
        MemorySecretStore::new(&settings.service),
        ScriptedAuthenticator::approving(),
        SqliteItemStore::open(&db_path).unwrap(),
    )
    .unwrap();
    session.setup("pw").await.unwrap();
    for title in ["a", "b", "c"] {
        let mut item = VaultItem::default();
        item.title = title.to_string();
        session.encrypt_and_store(&item).unwrap();
    }
    assert_eq!(session.item_store().all().unwrap().len(), 3);

    session.reset().await.unwrap();
    assert!(session.item_store().all().unwrap().is_empty());
}
