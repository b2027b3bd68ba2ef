//! Digest helpers for passphrase records.

use sha2::{Digest, Sha256};

/// Computes the lowercase hex SHA-256 digest of `data`.
///
/// Used for the vault secret record and for mnemonic-passphrase
/// redaction: only this digest is ever persisted, never the plaintext.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
