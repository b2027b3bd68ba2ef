//! Cryptographic primitives for the Coffre key vault.
//!
//! Pure functions only: no filesystem access, no prompting, no network.
//!
//! - [`envelope`] — passphrase-based authenticated encryption container
//!   (scrypt + AES-256-GCM) for at-rest JSON blobs.
//! - [`mnemonic`] — BIP39 mnemonic generation, import, and seed derivation.
//! - [`derive`] — per-chain (ETH/BTC) hierarchical key and address
//!   derivation.
//! - [`hash`] — digest helpers for passphrase records.

pub mod derive;
pub mod envelope;
pub mod hash;
pub mod mnemonic;
