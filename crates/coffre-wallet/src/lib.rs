//! Wallet, account, and address domain model.
//!
//! A [`wallet::Wallet`] owns one in-memory mnemonic and an alias-keyed
//! set of accounts; each account materializes one Ethereum and one
//! Bitcoin address at a fixed derivation index. Persistence goes
//! through [`wallet::StoredWalletData`], which redacts the mnemonic
//! passphrase down to a boolean flag and a SHA-256 digest.

pub mod account;
pub mod address;
pub mod wallet;

pub use account::Account;
pub use address::{BtcAddress, Chain, ChainAddress, EthAddress};
pub use wallet::{validate_alias, StoredMnemonic, StoredWalletData, Wallet};
