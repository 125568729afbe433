//! High-level vault operations used by the app layer.
//!
//! `VaultSession` wraps the secret store, the biometric gate, the item
//! store and the crypto layer so the rest of the application can work with
//! simple calls like `session.unlock().await` or
//! `session.encrypt_and_store(&item)`.
//!
//! The session key is cached in the secret store at setup and reloaded on
//! every unlock; `unlock()` never sees the master password. The password
//! is only needed again for `verify_master_password` and `rekey`.

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use zeroize::Zeroizing;

use super::state::SessionState;
use crate::biometric::{BiometricAuthenticator, BiometricError, BiometricGate, CancelReason};
use crate::config::Settings;
use crate::crypto::{
    decrypt, derive_key_with_params, encrypt, generate_salt, EncryptedPayload, SymmetricKey,
    NONCE_LEN, SALT_LEN,
};
use crate::errors::{Result, VaultError};
use crate::item::{
    decode_item, encode_item, DecryptedItem, ItemId, ItemRecord, ItemStore, VaultItem,
};
use crate::secret_store::{SecretStore, KEY_ID, SALT_ID};

/// Services with a live session in this process.
static ACTIVE_SERVICES: parking_lot::Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

/// Reservation of a service identifier, released on drop.
struct SessionClaim {
    service: String,
}

impl SessionClaim {
    fn acquire(service: &str) -> Result<Self> {
        let mut active = ACTIVE_SERVICES.lock();
        if active.iter().any(|s| s == service) {
            return Err(VaultError::SessionAlreadyActive(service.to_string()));
        }
        active.push(service.to_string());
        Ok(Self {
            service: service.to_string(),
        })
    }
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        ACTIVE_SERVICES.lock().retain(|s| s != &self.service);
    }
}

/// Result of a bulk load.
#[derive(Debug, Clone, Default)]
pub struct LoadedVault {
    /// Every record that decrypted and decoded cleanly, oldest first.
    pub items: Vec<DecryptedItem>,
    /// Records that could not be read and were left out.
    pub skipped: Vec<ItemId>,
}

/// Mutable session state, guarded by one lock.
struct Inner {
    state: SessionState,
    key: Option<SymmetricKey>,
    cache: Option<Vec<DecryptedItem>>,
    /// Bumped by every lock and reset so an in-flight unlock can tell it
    /// was overtaken.
    epoch: u64,
}

impl Inner {
    fn active_key(&self) -> Result<&SymmetricKey> {
        match (self.state, self.key.as_ref()) {
            (SessionState::Unlocked, Some(key)) => Ok(key),
            _ => Err(VaultError::NoActiveSession),
        }
    }

    /// Drop the key (zeroized on drop) and every decrypted item.
    fn forget(&mut self) {
        self.key = None;
        self.cache = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// The vault session controller.
///
/// Sole owner of the session state and the in-memory key. Setup, unlock,
/// re-key and reset are serialized; `lock()` is synchronous and may be
/// called from anywhere, including while an unlock prompt is on screen.
///
/// Only one session per service identifier may exist in a process at a
/// time; `new` fails with `SessionAlreadyActive` otherwise.
pub struct VaultSession<S, A, I> {
    settings: Settings,
    secrets: S,
    gate: BiometricGate<A>,
    items: I,
    inner: RwLock<Inner>,
    transitions: AsyncMutex<()>,
    /// Item writes hold this shared; re-key and reset hold it exclusively
    /// so no record is written under a key that is about to be replaced.
    writes: RwLock<()>,
    _claim: SessionClaim,
}

impl<S, A, I> VaultSession<S, A, I>
where
    S: SecretStore,
    A: BiometricAuthenticator,
    I: ItemStore,
{
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Build the session for `settings.service`.
    ///
    /// The session starts `Uninitialized`; call `check_setup` to read the
    /// real state from the secret store.
    pub fn new(settings: Settings, secrets: S, authenticator: A, items: I) -> Result<Self> {
        let claim = SessionClaim::acquire(&settings.service)?;
        Ok(Self {
            settings,
            secrets,
            gate: BiometricGate::new(authenticator),
            items,
            inner: RwLock::new(Inner {
                state: SessionState::Uninitialized,
                key: None,
                cache: None,
                epoch: 0,
            }),
            transitions: AsyncMutex::new(()),
            writes: RwLock::new(()),
            _claim: claim,
        })
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state().is_unlocked()
    }

    /// Read whether a vault exists from the secret store.
    ///
    /// Reports `Uninitialized` when no salt is stored and `Locked`
    /// otherwise. An open session stays open. Never waits on an unlock
    /// prompt: while another transition is in flight the current state is
    /// returned as is.
    pub async fn check_setup(&self) -> SessionState {
        match self.transitions.try_lock() {
            Ok(_transition) => self.refresh_setup_state(),
            Err(_) => self.state(),
        }
    }

    /// Create the vault from `master_password` and leave it unlocked.
    ///
    /// The password is wiped as soon as the key has been derived. On any
    /// failure the session stays `Uninitialized`. If `lock()` is called
    /// while setup runs, the vault is still created but ends `Locked` and
    /// the key is not kept in memory.
    pub async fn setup(&self, master_password: impl Into<String>) -> Result<()> {
        let master_password = Zeroizing::new(master_password.into());
        let _transition = self.transitions.lock().await;

        if self.refresh_setup_state() != SessionState::Uninitialized {
            return Err(VaultError::AlreadyInitialized);
        }
        let epoch = self.inner.read().epoch;

        let salt = generate_salt()?;
        let key = derive_key_with_params(&master_password, &salt, &self.settings.kdf_params())?;
        drop(master_password);

        // The salt marks the vault as existing, so it goes in last.
        self.secrets.save(key.as_bytes(), KEY_ID)?;
        if let Err(e) = self.secrets.save(&salt, SALT_ID) {
            if let Err(cleanup) = self.secrets.delete(KEY_ID) {
                tracing::warn!(error = %cleanup, "could not remove key after failed setup");
            }
            return Err(e);
        }

        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            inner.state = SessionState::Locked;
            tracing::info!(service = %self.settings.service, "vault created, locked during setup");
            return Ok(());
        }
        inner.key = Some(key);
        inner.cache = None;
        inner.state = SessionState::Unlocked;
        tracing::info!(service = %self.settings.service, "vault created");
        Ok(())
    }

    /// Authenticate with biometrics (passcode fallback allowed), load the
    /// session key and open the vault, using the configured prompt text.
    pub async fn unlock(&self) -> Result<()> {
        let reason = self.settings.unlock_reason.clone();
        self.unlock_with_reason(&reason).await
    }

    /// `unlock` with an explicit prompt text.
    ///
    /// The session only becomes `Unlocked` once both the prompt and the key
    /// load have succeeded. A `lock()` that lands while the prompt is up
    /// wins: this call then fails with `Cancelled(System)`.
    pub async fn unlock_with_reason(&self, reason: &str) -> Result<()> {
        let _transition = self.transitions.lock().await;

        match self.refresh_setup_state() {
            SessionState::Uninitialized => return Err(VaultError::NotInitialized),
            SessionState::Unlocked => return Ok(()),
            SessionState::Locked => {}
        }
        let epoch = self.inner.read().epoch;

        if let Err(e) = self.gate.authenticate_with_fallback(reason).await {
            tracing::info!(error = %e, "unlock authentication did not succeed");
            return Err(e.into());
        }

        let raw = Zeroizing::new(self.secrets.load(KEY_ID)?);
        let key = SymmetricKey::from_slice(&raw)
            .map_err(|_| VaultError::UnexpectedFormat(KEY_ID.to_string()))?;

        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            return Err(BiometricError::Cancelled(CancelReason::System).into());
        }
        inner.key = Some(key);
        inner.cache = None;
        inner.state = SessionState::Unlocked;
        tracing::info!(service = %self.settings.service, "vault unlocked");
        Ok(())
    }

    /// Drop the session key and every decrypted item.
    ///
    /// Always succeeds; a no-op on a locked vault apart from cancelling
    /// any unlock prompt still in flight.
    pub fn lock(&self) {
        let was_unlocked = {
            let mut inner = self.inner.write();
            inner.forget();
            let was_unlocked = inner.state.is_unlocked();
            if was_unlocked {
                inner.state = SessionState::Locked;
            }
            was_unlocked
        };
        self.gate.invalidate();

        if was_unlocked {
            tracing::info!(service = %self.settings.service, "vault locked");
        }
    }

    /// App-lifecycle hook for backgrounding: tears down any authentication
    /// prompt and locks.
    pub fn on_background(&self) {
        self.lock();
    }

    /// Check `password` against the open session's key.
    pub fn verify_master_password(&self, password: &str) -> Result<bool> {
        self.ensure_unlocked()?;
        let salt = self.load_salt()?;
        let candidate = derive_key_with_params(password, &salt, &self.settings.kdf_params())?;
        let inner = self.inner.read();
        Ok(inner.active_key()?.ct_eq(&candidate))
    }

    /// Change the master password.
    ///
    /// Every record is decrypted first; if any of them cannot be read the
    /// re-key is abandoned before anything is written. Records are then
    /// re-encrypted under a key derived from `new_password` and a new
    /// salt, and the new key and salt replace the old ones. A failed write
    /// restores the records and key written so far.
    pub async fn rekey(
        &self,
        current_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<()> {
        let current_password = Zeroizing::new(current_password.into());
        let new_password = Zeroizing::new(new_password.into());
        let _transition = self.transitions.lock().await;

        if !self.verify_master_password(&current_password)? {
            return Err(VaultError::PasswordMismatch);
        }
        drop(current_password);

        let _writes = self.writes.write();
        let originals = self.items.all()?;
        let (old_key, plaintexts) = {
            let inner = self.inner.read();
            let key = inner.active_key()?;
            let plaintexts = originals
                .iter()
                .map(|record| open_record(record, key))
                .collect::<Result<Vec<_>>>()?;
            (Zeroizing::new(*key.as_bytes()), plaintexts)
        };

        let salt = generate_salt()?;
        let new_key = derive_key_with_params(&new_password, &salt, &self.settings.kdf_params())?;
        drop(new_password);

        let mut rewritten = Vec::with_capacity(originals.len());
        for (record, plaintext) in originals.iter().zip(&plaintexts) {
            let payload = encrypt(plaintext, &new_key)?;
            rewritten.push(ItemRecord {
                ciphertext: payload.ciphertext,
                nonce: payload.nonce.to_vec(),
                ..record.clone()
            });
        }
        drop(plaintexts);

        for (written, record) in rewritten.into_iter().enumerate() {
            if let Err(e) = self.items.update(record) {
                self.restore_records(&originals[..written]);
                return Err(e);
            }
        }
        if let Err(e) = self.secrets.save(new_key.as_bytes(), KEY_ID) {
            self.restore_records(&originals);
            return Err(e);
        }
        if let Err(e) = self.secrets.save(&salt, SALT_ID) {
            self.restore_records(&originals);
            if let Err(restore) = self.secrets.save(old_key.as_slice(), KEY_ID) {
                tracing::warn!(error = %restore, "could not restore previous key after failed re-key");
            }
            return Err(e);
        }

        let mut inner = self.inner.write();
        if inner.state.is_unlocked() {
            inner.key = Some(new_key);
            inner.cache = None;
        }
        tracing::info!(
            service = %self.settings.service,
            items = originals.len(),
            "vault re-keyed"
        );
        Ok(())
    }

    /// Delete every record and both secrets; the session returns to
    /// `Uninitialized`.
    pub async fn reset(&self) -> Result<()> {
        let _transition = self.transitions.lock().await;
        let _writes = self.writes.write();

        self.items.clear()?;
        self.secrets.delete(KEY_ID)?;
        self.secrets.delete(SALT_ID)?;

        {
            let mut inner = self.inner.write();
            inner.forget();
            inner.state = SessionState::Uninitialized;
        }
        self.gate.invalidate();
        tracing::info!(service = %self.settings.service, "vault reset");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Item operations
    // ------------------------------------------------------------------

    /// Encrypt `item` under the session key and hand it to the item store.
    pub fn encrypt_and_store(&self, item: &VaultItem) -> Result<ItemId> {
        let _writes = self.writes.read();
        let payload = {
            let inner = self.inner.read();
            seal(item, inner.active_key()?)?
        };

        let now = Utc::now();
        let id = ItemId::new();
        self.items.insert(ItemRecord {
            id,
            ciphertext: payload.ciphertext,
            nonce: payload.nonce.to_vec(),
            created_at: now,
            updated_at: now,
        })?;

        self.update_cache(|cache| {
            cache.push(DecryptedItem {
                id,
                item: item.clone(),
                created_at: now,
                updated_at: now,
            })
        });
        Ok(id)
    }

    /// Decrypt every stored record.
    ///
    /// A record that fails to decrypt or decode is skipped and reported in
    /// `LoadedVault::skipped`; the rest of the vault still loads.
    pub fn load_and_decrypt_all(&self) -> Result<LoadedVault> {
        self.ensure_unlocked()?;
        let records = self.items.all()?;

        let mut loaded = LoadedVault::default();
        let epoch = {
            let inner = self.inner.read();
            let key = inner.active_key()?;
            for record in records {
                match decrypt_record(&record, key) {
                    Ok(item) => loaded.items.push(DecryptedItem {
                        id: record.id,
                        item,
                        created_at: record.created_at,
                        updated_at: record.updated_at,
                    }),
                    Err(e) => {
                        tracing::warn!(item = %record.id, error = %e, "skipping unreadable item");
                        loaded.skipped.push(record.id);
                    }
                }
            }
            inner.epoch
        };

        let mut inner = self.inner.write();
        if inner.epoch == epoch && inner.state.is_unlocked() {
            inner.cache = Some(loaded.items.clone());
        }
        Ok(loaded)
    }

    /// Decrypt a single record. Failures propagate.
    pub fn get_item(&self, id: ItemId) -> Result<DecryptedItem> {
        self.ensure_unlocked()?;
        let record = self.items.get(&id)?.ok_or(VaultError::ItemNotFound(id))?;

        let inner = self.inner.read();
        let item = decrypt_record(&record, inner.active_key()?)?;
        Ok(DecryptedItem {
            id,
            item,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Replace the contents of an existing item with a fresh nonce.
    ///
    /// The creation time is preserved.
    pub fn update_item(&self, id: ItemId, item: &VaultItem) -> Result<()> {
        let _writes = self.writes.read();
        self.ensure_unlocked()?;
        let existing = self.items.get(&id)?.ok_or(VaultError::ItemNotFound(id))?;

        let payload = {
            let inner = self.inner.read();
            seal(item, inner.active_key()?)?
        };

        let now = Utc::now();
        self.items.update(ItemRecord {
            id,
            ciphertext: payload.ciphertext,
            nonce: payload.nonce.to_vec(),
            created_at: existing.created_at,
            updated_at: now,
        })?;

        self.update_cache(|cache| {
            if let Some(entry) = cache.iter_mut().find(|entry| entry.id == id) {
                entry.item = item.clone();
                entry.updated_at = now;
            }
        });
        Ok(())
    }

    /// Remove an item from the store.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        let _writes = self.writes.read();
        self.ensure_unlocked()?;
        if !self.items.remove(&id)? {
            return Err(VaultError::ItemNotFound(id));
        }
        self.update_cache(|cache| cache.retain(|entry| entry.id != id));
        Ok(())
    }

    /// Items decrypted by the last bulk load, kept current by later
    /// writes. `None` until `load_and_decrypt_all` has run.
    pub fn cached_items(&self) -> Result<Option<Vec<DecryptedItem>>> {
        let inner = self.inner.read();
        inner.active_key()?;
        Ok(inner.cache.clone())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn secret_store(&self) -> &S {
        &self.secrets
    }

    pub fn item_store(&self) -> &I {
        &self.items
    }

    pub fn gate(&self) -> &BiometricGate<A> {
        &self.gate
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_unlocked(&self) -> Result<()> {
        self.inner.read().active_key().map(|_| ())
    }

    /// Sync the state with the salt entry. Caller holds `transitions`.
    fn refresh_setup_state(&self) -> SessionState {
        let exists = self.secrets.exists(SALT_ID);
        let mut inner = self.inner.write();
        match (exists, inner.state) {
            (false, _) => {
                inner.forget();
                inner.state = SessionState::Uninitialized;
            }
            (true, SessionState::Uninitialized) => inner.state = SessionState::Locked,
            (true, _) => {}
        }
        inner.state
    }

    fn load_salt(&self) -> Result<[u8; SALT_LEN]> {
        let bytes = self.secrets.load(SALT_ID)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::UnexpectedFormat(SALT_ID.to_string()))
    }

    fn update_cache(&self, f: impl FnOnce(&mut Vec<DecryptedItem>)) {
        let mut inner = self.inner.write();
        if inner.state.is_unlocked() {
            if let Some(cache) = inner.cache.as_mut() {
                f(cache);
            }
        }
    }

    /// Best-effort write-back of records after a failed re-key.
    fn restore_records(&self, originals: &[ItemRecord]) {
        for record in originals {
            if let Err(e) = self.items.update(record.clone()) {
                tracing::warn!(item = %record.id, error = %e, "could not restore item after failed re-key");
            }
        }
    }
}

/// Serialize and encrypt one item.
fn seal(item: &VaultItem, key: &SymmetricKey) -> Result<EncryptedPayload> {
    let plaintext = encode_item(item)?;
    encrypt(&plaintext, key)
}

/// Decrypt one record into its plaintext buffer.
fn open_record(record: &ItemRecord, key: &SymmetricKey) -> Result<Zeroizing<Vec<u8>>> {
    let nonce: [u8; NONCE_LEN] = record
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| VaultError::InvalidCiphertext)?;
    decrypt(&record.ciphertext, &nonce, key).map(Zeroizing::new)
}

fn decrypt_record(record: &ItemRecord, key: &SymmetricKey) -> Result<VaultItem> {
    let plaintext = open_record(record, key)?;
    decode_item(&plaintext)
}
