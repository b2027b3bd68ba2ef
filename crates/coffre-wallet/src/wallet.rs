//! Wallet aggregate: creation, rehydration, and redacted serialization.
//!
//! The persisted form ([`StoredWalletData`]) carries the mnemonic words
//! (protected at rest by the vault envelope) but never the mnemonic
//! passphrase — only a flag and a SHA-256 digest used to verify
//! re-entered passphrases before any key derivation runs.

use std::collections::BTreeMap;

use coffre_crypto::hash::sha256_hex;
use coffre_crypto::mnemonic::Mnemonic;
use coffre_types::network::Network;
use coffre_types::{CoffreError, Result};
use serde::{Deserialize, Serialize};

use crate::account::Account;

/// Alias the first account of every new wallet receives.
pub const DEFAULT_ACCOUNT_ALIAS: &str = "default";

// ---------------------------------------------------------------------------
// Alias validation
// ---------------------------------------------------------------------------

/// Validates a wallet or account alias.
///
/// Aliases are non-empty and restricted to `[A-Za-z0-9_-]`; validation
/// runs before any file I/O or derivation.
///
/// # Errors
///
/// [`CoffreError::Parameter`] naming the offending alias.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(CoffreError::parameter("alias must not be empty"));
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoffreError::parameter(format!(
            "invalid alias {alias:?}: only letters, digits, '_' and '-' are allowed"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stored forms
// ---------------------------------------------------------------------------

/// Persisted mnemonic form: words plus a redacted passphrase record.
///
/// # Invariants
///
/// - Never carries the plaintext passphrase.
/// - `passphrase_sha256` is present exactly when `has_passphrase` is.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMnemonic {
    pub words: String,
    pub has_passphrase: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_sha256: Option<String>,
}

/// Persisted account form: derivation inputs only, no key material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredAccount {
    pub alias: String,
    pub index: u32,
}

/// The only wallet form that is ever written to disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredWalletData {
    pub alias: String,
    pub mnemonic: StoredMnemonic,
    pub accounts: Vec<StoredAccount>,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// In-memory wallet: an alias, the live mnemonic, and alias-keyed
/// accounts with derived addresses.
pub struct Wallet {
    alias: String,
    mnemonic: Mnemonic,
    network: Network,
    accounts: BTreeMap<String, Account>,
}

impl Wallet {
    // -- Accessors --------------------------------------------------------

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn mnemonic(&self) -> &Mnemonic {
        &self.mnemonic
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account(&self, alias: &str) -> Option<&Account> {
        self.accounts.get(alias)
    }

    // -- Lifecycle --------------------------------------------------------

    /// Builds a wallet around `mnemonic` with one account at index 0,
    /// aliased [`DEFAULT_ACCOUNT_ALIAS`].
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] for an invalid alias.
    pub fn generate_with_default_account(
        alias: &str,
        mnemonic: Mnemonic,
        network: Network,
    ) -> Result<Self> {
        validate_alias(alias)?;
        let mut wallet = Self {
            alias: alias.to_owned(),
            mnemonic,
            network,
            accounts: BTreeMap::new(),
        };
        wallet.add_account(DEFAULT_ACCOUNT_ALIAS, 0)?;
        Ok(wallet)
    }

    /// Derives and attaches a new account.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] if the alias is invalid or already
    /// taken within this wallet.
    pub fn add_account(&mut self, alias: &str, index: u32) -> Result<&Account> {
        validate_alias(alias)?;
        if self.accounts.contains_key(alias) {
            return Err(CoffreError::parameter(format!(
                "account alias {alias:?} already exists in wallet {:?}",
                self.alias
            )));
        }
        let account = Account::derive(alias, index, &self.mnemonic, self.network)?;
        Ok(self.accounts.entry(alias.to_owned()).or_insert(account))
    }

    /// Emits the persistable form, replacing the plaintext passphrase
    /// with a flag and its SHA-256 digest.
    pub fn serialize(&self) -> StoredWalletData {
        let passphrase_sha256 = self
            .mnemonic
            .passphrase()
            .map(|p| sha256_hex(p.as_bytes()));
        StoredWalletData {
            alias: self.alias.clone(),
            mnemonic: StoredMnemonic {
                words: self.mnemonic.words().to_owned(),
                has_passphrase: passphrase_sha256.is_some(),
                passphrase_sha256,
            },
            accounts: self
                .accounts
                .values()
                .map(|a| StoredAccount {
                    alias: a.alias.clone(),
                    index: a.index,
                })
                .collect(),
        }
    }

    /// Rehydrates a wallet from its stored form.
    ///
    /// # Process
    ///
    /// 1. If the stored mnemonic is passphrase-protected, require a
    ///    candidate passphrase and compare its SHA-256 digest to the
    ///    stored digest — before touching any key material.
    /// 2. Rebuild the in-memory mnemonic with the verified passphrase.
    /// 3. Re-derive every stored account's addresses.
    ///
    /// # Errors
    ///
    /// - [`CoffreError::Authentication`] if a required passphrase is
    ///   missing or its digest does not match. The message is generic;
    ///   no derivation happens on this path.
    /// - [`CoffreError::Parameter`] if the stored words fail BIP39
    ///   validation.
    pub fn from_stored(
        stored: &StoredWalletData,
        passphrase: Option<&str>,
        network: Network,
    ) -> Result<Self> {
        // 1. Verify the passphrase digest before any derivation.
        let verified = if stored.mnemonic.has_passphrase {
            let expected = stored
                .mnemonic
                .passphrase_sha256
                .as_deref()
                .ok_or(CoffreError::Authentication)?;
            let candidate = passphrase.ok_or(CoffreError::Authentication)?;
            if sha256_hex(candidate.as_bytes()) != expected {
                return Err(CoffreError::Authentication);
            }
            Some(candidate.to_owned())
        } else {
            None
        };

        // 2. Rebuild the live mnemonic.
        let mnemonic = Mnemonic::import(&stored.mnemonic.words, verified)?;

        // 3. Re-derive accounts.
        let mut wallet = Self {
            alias: stored.alias.clone(),
            mnemonic,
            network,
            accounts: BTreeMap::new(),
        };
        for account in &stored.accounts {
            wallet.add_account(&account.alias, account.index)?;
        }
        Ok(wallet)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn wallet(passphrase: Option<&str>) -> Wallet {
        let mnemonic = Mnemonic::import(MNEMONIC_12, passphrase.map(str::to_owned)).unwrap();
        Wallet::generate_with_default_account("main", mnemonic, Network::Mainnet).unwrap()
    }

    #[test]
    fn new_wallet_has_default_account() {
        let w = wallet(None);
        let account = w.account(DEFAULT_ACCOUNT_ALIAS).unwrap();
        assert_eq!(account.index, 0);
        assert_eq!(w.accounts().count(), 1);
    }

    #[test]
    fn alias_validation() {
        assert!(validate_alias("main-wallet_2").is_ok());
        for bad in ["", "has space", "emoji🔑", "semi;colon", "slash/"] {
            assert!(
                matches!(validate_alias(bad), Err(CoffreError::Parameter { .. })),
                "alias {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_account_alias_rejected() {
        let mut w = wallet(None);
        let err = w.add_account(DEFAULT_ACCOUNT_ALIAS, 1);
        assert!(matches!(err, Err(CoffreError::Parameter { .. })));
    }

    #[test]
    fn serialize_redacts_passphrase() {
        let stored = wallet(Some("hunter2")).serialize();
        assert!(stored.mnemonic.has_passphrase);
        let digest = stored.mnemonic.passphrase_sha256.unwrap();
        assert_ne!(digest, "hunter2");
        assert_eq!(digest, sha256_hex(b"hunter2"));
        let json = serde_json::to_string(&wallet(Some("hunter2")).serialize()).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn round_trip_without_passphrase() {
        let original = wallet(None);
        let restored =
            Wallet::from_stored(&original.serialize(), None, Network::Mainnet).unwrap();
        assert_eq!(restored.alias(), original.alias());
        let (a, b) = (
            original.account(DEFAULT_ACCOUNT_ALIAS).unwrap(),
            restored.account(DEFAULT_ACCOUNT_ALIAS).unwrap(),
        );
        assert_eq!(a.btc.keys.address, b.btc.keys.address);
        assert_eq!(a.eth.keys.address, b.eth.keys.address);
        assert_eq!(a.btc.keys.private_key_wif, b.btc.keys.private_key_wif);
    }

    #[test]
    fn round_trip_with_passphrase() {
        let original = wallet(Some("hunter2"));
        let restored =
            Wallet::from_stored(&original.serialize(), Some("hunter2"), Network::Mainnet).unwrap();
        let (a, b) = (
            original.account(DEFAULT_ACCOUNT_ALIAS).unwrap(),
            restored.account(DEFAULT_ACCOUNT_ALIAS).unwrap(),
        );
        assert_eq!(a.btc.keys.address, b.btc.keys.address);
        assert_eq!(a.eth.keys.private_key, b.eth.keys.private_key);
    }

    #[test]
    fn wrong_passphrase_fails_before_derivation() {
        let stored = wallet(Some("hunter2")).serialize();
        let err = Wallet::from_stored(&stored, Some("wrong"), Network::Mainnet);
        assert!(matches!(err, Err(CoffreError::Authentication)));
    }

    #[test]
    fn missing_passphrase_fails() {
        let stored = wallet(Some("hunter2")).serialize();
        let err = Wallet::from_stored(&stored, None, Network::Mainnet);
        assert!(matches!(err, Err(CoffreError::Authentication)));
    }

    #[test]
    fn stored_form_uses_camel_case_keys() {
        let json = serde_json::to_value(wallet(Some("p")).serialize()).unwrap();
        let mnemonic = &json["mnemonic"];
        assert!(mnemonic.get("hasPassphrase").is_some());
        assert!(mnemonic.get("passphraseSha256").is_some());
    }

    #[test]
    fn extra_accounts_survive_round_trip() {
        let mut original = wallet(None);
        original.add_account("savings", 1).unwrap();
        let restored =
            Wallet::from_stored(&original.serialize(), None, Network::Mainnet).unwrap();
        assert_eq!(restored.accounts().count(), 2);
        assert_eq!(
            restored.account("savings").unwrap().btc.keys.address,
            original.account("savings").unwrap().btc.keys.address
        );
    }
}
