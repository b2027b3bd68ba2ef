//! The secret gate: one vault passphrase per installation.
//!
//! Bootstrapped exactly once (interactively with a confirmation
//! repeat, or from the environment) and re-verified on every run
//! before the repository decrypts anything. Verification failures are
//! reported with one generic message so callers cannot tell whether
//! the record existed or which check failed.

use coffre_crypto::hash::sha256_hex;
use coffre_types::{CoffreError, Result};
use tracing::info;

use crate::store::{SecretRecord, VaultStore};

/// Environment override for the vault passphrase.
///
/// Blank or whitespace-only values are treated as absent.
pub const PASSPHRASE_ENV: &str = "COFFRE_PASSPHRASE";

// ---------------------------------------------------------------------------
// SecretPrompt
// ---------------------------------------------------------------------------

/// Interactive secret entry, injected so the gate stays testable
/// without a terminal.
pub trait SecretPrompt {
    /// Prompts for a secret. `Ok(None)` means the user cancelled.
    fn read_secret(&self, prompt: &str) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Verifies or bootstraps the vault passphrase and installs it into
/// `store` for envelope encryption.
///
/// # Process
///
/// 1. Read the environment override; blank counts as absent.
/// 2. No secret record yet: take the environment value, or prompt
///    twice and require both entries to match, then persist the digest.
///    This bootstrap is one-time and irreversible.
/// 3. Record exists: take the environment value, or prompt once.
/// 4. Compare SHA-256 digests; mismatch is a generic
///    [`CoffreError::Authentication`].
///
/// Must run before any operation that touches the wallet collection.
pub fn unlock(store: &mut VaultStore, prompt: &dyn SecretPrompt) -> Result<()> {
    let from_env = std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty());

    let candidate = match store.secret_record()? {
        None => {
            let candidate = match from_env {
                Some(value) => value,
                None => bootstrap_interactive(prompt)?,
            };
            store.write_secret_record(&SecretRecord {
                hash: sha256_hex(candidate.as_bytes()),
            })?;
            info!("vault passphrase bootstrapped");
            candidate
        }
        Some(record) => {
            let candidate = match from_env {
                Some(value) => value,
                None => prompt
                    .read_secret("Vault passphrase")?
                    .ok_or_else(cancelled)?,
            };
            if sha256_hex(candidate.as_bytes()) != record.hash {
                return Err(CoffreError::Authentication);
            }
            candidate
        }
    };

    store.set_passphrase(candidate);
    Ok(())
}

fn bootstrap_interactive(prompt: &dyn SecretPrompt) -> Result<String> {
    let first = prompt
        .read_secret("Choose a vault passphrase")?
        .ok_or_else(cancelled)?;
    let second = prompt
        .read_secret("Repeat the vault passphrase")?
        .ok_or_else(cancelled)?;
    if first != second {
        return Err(CoffreError::parameter("passphrases do not match"));
    }
    Ok(first)
}

fn cancelled() -> CoffreError {
    CoffreError::parameter("passphrase entry cancelled")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
