//! Whole-file wallet collection storage built on the envelope codec.
//!
//! Each collection is one file, rewritten whole on every mutation:
//! there is no partial-update path, so a file on disk is always either
//! fully valid or the load fails outright. Mutations take an exclusive
//! advisory lock on a sidecar lockfile and re-read the collection
//! under it, so concurrent processes serialize their read-modify-write
//! cycles instead of clobbering each other.

use std::fs;
use std::path::{Path, PathBuf};

use coffre_crypto::envelope::{self, Envelope};
use coffre_types::{CoffreError, Result};
use coffre_wallet::wallet::StoredWalletData;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Collection file holding the wallet list.
const WALLETS_FILE: &str = "wallets.json";
/// Collection file holding the passphrase digest. Always plaintext.
const SECRET_FILE: &str = "secret.json";
/// Sidecar file carrying the advisory mutation lock.
const LOCK_FILE: &str = ".vault.lock";

// ---------------------------------------------------------------------------
// SecretRecord
// ---------------------------------------------------------------------------

/// The one unencrypted record in the vault: the gate digest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretRecord {
    /// SHA-256 hex of the vault passphrase.
    pub hash: String,
}

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// Wallet repository over one vault directory.
///
/// The wallet collection is cached per process after the first read;
/// mutations drop the cache, re-read under the lock, write, then
/// repopulate it, so memory never outlives what disk confirms.
pub struct VaultStore {
    dir: PathBuf,
    passphrase: Option<String>,
    cache: Option<Vec<StoredWalletData>>,
}

impl VaultStore {
    /// Opens (creating if needed) the vault directory.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Persistence`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CoffreError::persistence(format!("cannot create vault directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            passphrase: None,
            cache: None,
        })
    }

    /// The vault directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Installs the gate-verified encryption passphrase.
    ///
    /// Called by the secret gate after digest verification; any cached
    /// plaintext read is dropped so the next access decrypts fresh.
    pub fn set_passphrase(&mut self, passphrase: String) {
        self.passphrase = Some(passphrase);
        self.cache = None;
    }

    // -- Secret collection ------------------------------------------------

    /// Reads the secret record, if one was ever bootstrapped.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Persistence`] on unreadable or corrupt content.
    pub fn secret_record(&self) -> Result<Option<SecretRecord>> {
        let path = self.dir.join(SECRET_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoffreError::persistence(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        let record: SecretRecord = serde_json::from_str(&raw).map_err(|e| {
            CoffreError::persistence(format!("corrupt secret record {}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }

    /// Persists the secret record during the one-time gate bootstrap.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Persistence`] if a record already exists; the
    /// bootstrap is irreversible and the digest is never overwritten.
    pub fn write_secret_record(&self, record: &SecretRecord) -> Result<()> {
        let _lock = self.lock_exclusive()?;
        if self.secret_record()?.is_some() {
            return Err(CoffreError::persistence(
                "secret record already exists; refusing to overwrite",
            ));
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| CoffreError::persistence(format!("cannot encode secret record: {e}")))?;
        self.write_atomic(SECRET_FILE, json.as_bytes())
    }

    // -- Wallet collection ------------------------------------------------

    /// Returns every stored wallet, reading from disk on first access.
    ///
    /// # Errors
    ///
    /// - [`CoffreError::Decryption`] on a bad vault passphrase.
    /// - [`CoffreError::Persistence`] on unreadable or corrupt storage.
    pub fn all_wallets(&mut self) -> Result<&[StoredWalletData]> {
        if self.cache.is_none() {
            self.cache = Some(self.read_wallets()?);
        }
        // Populated just above.
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    /// Linear search by wallet alias.
    pub fn get_wallet(&mut self, alias: &str) -> Result<Option<StoredWalletData>> {
        Ok(self
            .all_wallets()?
            .iter()
            .find(|w| w.alias == alias)
            .cloned())
    }

    /// Appends a wallet to the collection.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] if the alias is already taken.
    pub fn save(&mut self, wallet: StoredWalletData) -> Result<()> {
        self.mutate(|wallets| {
            if wallets.iter().any(|w| w.alias == wallet.alias) {
                return Err(CoffreError::parameter(format!(
                    "wallet alias {:?} already exists",
                    wallet.alias
                )));
            }
            wallets.push(wallet);
            Ok(())
        })
    }

    /// Removes a wallet; the entry is permanently gone afterwards.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] if no wallet has that alias.
    pub fn remove(&mut self, alias: &str) -> Result<()> {
        self.mutate(|wallets| {
            let before = wallets.len();
            wallets.retain(|w| w.alias != alias);
            if wallets.len() == before {
                return Err(CoffreError::parameter(format!("unknown wallet {alias:?}")));
            }
            Ok(())
        })
    }

    /// Renames a wallet in place.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] if `from` is unknown, `to` is taken,
    /// or `to` fails alias validation.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        coffre_wallet::validate_alias(to)?;
        self.mutate(|wallets| {
            if wallets.iter().any(|w| w.alias == to) {
                return Err(CoffreError::parameter(format!(
                    "wallet alias {to:?} already exists"
                )));
            }
            let entry = wallets
                .iter_mut()
                .find(|w| w.alias == from)
                .ok_or_else(|| CoffreError::parameter(format!("unknown wallet {from:?}")))?;
            entry.alias = to.to_owned();
            Ok(())
        })
    }

    // -- Internals --------------------------------------------------------

    /// Read-modify-write of the whole wallet collection under the
    /// advisory lock. The cache is refreshed from the post-write state
    /// only if the write succeeds.
    fn mutate(
        &mut self,
        op: impl FnOnce(&mut Vec<StoredWalletData>) -> Result<()>,
    ) -> Result<()> {
        let _lock = self.lock_exclusive()?;
        // Re-read under the lock; another process may have written
        // since our cache was populated.
        let mut wallets = self.read_wallets()?;
        op(&mut wallets)?;
        self.write_wallets(&wallets)?;
        self.cache = Some(wallets);
        Ok(())
    }

    fn read_wallets(&self) -> Result<Vec<StoredWalletData>> {
        let path = self.dir.join(WALLETS_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoffreError::persistence(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            CoffreError::persistence(format!("corrupt wallet collection {}: {e}", path.display()))
        })?;

        // A gated vault stores an envelope object; an unprotected one
        // stores the plain array.
        if value.is_array() {
            return serde_json::from_value(value).map_err(|e| {
                CoffreError::persistence(format!(
                    "corrupt wallet collection {}: {e}",
                    path.display()
                ))
            });
        }

        let envelope: Envelope = serde_json::from_value(value).map_err(|e| {
            CoffreError::persistence(format!("corrupt wallet envelope {}: {e}", path.display()))
        })?;
        let passphrase = self.passphrase.as_deref().ok_or_else(|| {
            CoffreError::persistence("wallet collection is encrypted but the vault is not unlocked")
        })?;
        let plaintext = envelope::decrypt(&envelope, passphrase)?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            CoffreError::persistence(format!("corrupt decrypted wallet collection: {e}"))
        })
    }

    fn write_wallets(&self, wallets: &[StoredWalletData]) -> Result<()> {
        let plaintext = serde_json::to_vec(&wallets)
            .map_err(|e| CoffreError::persistence(format!("cannot encode wallet collection: {e}")))?;

        let json = match &self.passphrase {
            Some(passphrase) => {
                let env = envelope::encrypt(&plaintext, passphrase)?;
                serde_json::to_string_pretty(&env).map_err(|e| {
                    CoffreError::persistence(format!("cannot encode wallet envelope: {e}"))
                })?
            }
            None => String::from_utf8(plaintext).map_err(|e| {
                CoffreError::persistence(format!("cannot encode wallet collection: {e}"))
            })?,
        };

        debug!(wallets = wallets.len(), encrypted = self.passphrase.is_some(), "writing wallet collection");
        self.write_atomic(WALLETS_FILE, json.as_bytes())
    }

    /// Write atomically: write to tmp, then rename.
    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<()> {
        let path = self.dir.join(name);
        let tmp_path = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp_path, contents).map_err(|e| {
            CoffreError::persistence(format!("cannot write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CoffreError::persistence(format!("cannot replace {}: {e}", path.display()))
        })
    }

    /// Takes the exclusive advisory lock; released when the returned
    /// handle drops.
    fn lock_exclusive(&self) -> Result<fs::File> {
        let path = self.dir.join(LOCK_FILE);
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                CoffreError::persistence(format!("cannot open lockfile {}: {e}", path.display()))
            })?;
        file.lock_exclusive().map_err(|e| {
            CoffreError::persistence(format!("cannot lock vault {}: {e}", path.display()))
        })?;
        Ok(file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use coffre_wallet::wallet::{StoredMnemonic, StoredWalletData};
    use tempfile::TempDir;

    fn stored(alias: &str) -> StoredWalletData {
        StoredWalletData {
            alias: alias.into(),
            mnemonic: StoredMnemonic {
                words: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about".into(),
                has_passphrase: false,
                passphrase_sha256: None,
            },
            accounts: vec![],
        }
    }

    fn open_vault(dir: &TempDir) -> VaultStore {
        let mut store = VaultStore::open(dir.path()).unwrap();
        store.set_passphrase("vault-pass".into());
        store
    }

    #[test]
    fn empty_vault_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        assert!(store.all_wallets().unwrap().is_empty());
    }

    #[test]
    fn save_get_remove_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);

        store.save(stored("alpha")).unwrap();
        store.save(stored("beta")).unwrap();
        assert_eq!(store.all_wallets().unwrap().len(), 2);
        assert!(store.get_wallet("alpha").unwrap().is_some());

        store.remove("alpha").unwrap();
        assert!(store.get_wallet("alpha").unwrap().is_none());
        assert_eq!(store.all_wallets().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_alias_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        store.save(stored("alpha")).unwrap();
        assert!(matches!(
            store.save(stored("alpha")),
            Err(CoffreError::Parameter { .. })
        ));
        assert_eq!(store.all_wallets().unwrap().len(), 1);
    }

    #[test]
    fn remove_unknown_alias_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        assert!(matches!(
            store.remove("ghost"),
            Err(CoffreError::Parameter { .. })
        ));
    }

    #[test]
    fn rename_moves_alias() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        store.save(stored("old")).unwrap();
        store.rename("old", "new").unwrap();
        assert!(store.get_wallet("old").unwrap().is_none());
        assert!(store.get_wallet("new").unwrap().is_some());
    }

    #[test]
    fn rename_validates_target() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        store.save(stored("old")).unwrap();
        assert!(store.rename("old", "bad alias").is_err());
        store.save(stored("taken")).unwrap();
        assert!(store.rename("old", "taken").is_err());
    }

    #[test]
    fn wallets_are_encrypted_at_rest() {
        let dir = TempDir::new().unwrap();
        let mut store = open_vault(&dir);
        store.save(stored("alpha")).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("wallets.json")).unwrap();
        assert!(!raw.contains("abandon"), "mnemonic words leaked to disk");
        assert!(raw.contains("\"ciphertext\""));
    }

    #[test]
    fn unprotected_vault_stores_plain_array() {
        let dir = TempDir::new().unwrap();
        let mut store = VaultStore::open(dir.path()).unwrap();
        store.save(stored("alpha")).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("wallets.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn reopening_with_passphrase_reads_back() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = open_vault(&dir);
            store.save(stored("alpha")).unwrap();
        }
        let mut reopened = open_vault(&dir);
        assert!(reopened.get_wallet("alpha").unwrap().is_some());
    }

    #[test]
    fn wrong_vault_passphrase_fails_decryption() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = open_vault(&dir);
            store.save(stored("alpha")).unwrap();
        }
        let mut reopened = VaultStore::open(dir.path()).unwrap();
        reopened.set_passphrase("not-the-pass".into());
        assert!(matches!(
            reopened.all_wallets(),
            Err(CoffreError::Decryption { .. })
        ));
    }

    #[test]
    fn corrupt_collection_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wallets.json"), b"{not json").unwrap();
        let mut store = open_vault(&dir);
        assert!(matches!(
            store.all_wallets(),
            Err(CoffreError::Persistence { .. })
        ));
    }

    #[test]
    fn secret_record_round_trip_and_no_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::open(dir.path()).unwrap();
        assert!(store.secret_record().unwrap().is_none());

        store
            .write_secret_record(&SecretRecord { hash: "abc".into() })
            .unwrap();
        assert_eq!(store.secret_record().unwrap().unwrap().hash, "abc");

        assert!(matches!(
            store.write_secret_record(&SecretRecord { hash: "def".into() }),
            Err(CoffreError::Persistence { .. })
        ));
        assert_eq!(store.secret_record().unwrap().unwrap().hash, "abc");
    }
}
