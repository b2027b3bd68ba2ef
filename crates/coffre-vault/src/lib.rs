//! On-disk vault: the secret gate and the wallet repository.
//!
//! The vault is a directory with one file per collection:
//! `wallets.json` (encrypted once a vault passphrase exists) and
//! `secret.json` (the plaintext SHA-256 digest of that passphrase).
//! The [`gate`] must run before any wallet operation; it verifies or
//! bootstraps the passphrase and hands it to the [`store`].

pub mod gate;
pub mod store;

pub use gate::{unlock, SecretPrompt, PASSPHRASE_ENV};
pub use store::VaultStore;
