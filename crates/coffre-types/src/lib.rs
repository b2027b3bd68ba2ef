//! Core shared types for the Coffre offline key vault.
//!
//! This crate defines the error taxonomy and network selection used
//! across the workspace. No other crate should define shared types —
//! everything lives here.

pub mod network;

use thiserror::Error;

pub use network::Network;

// ---------------------------------------------------------------------------
// CoffreError
// ---------------------------------------------------------------------------

/// Central error type for the Coffre system.
///
/// All crates in the workspace convert their internal errors into variants
/// of this enum, ensuring a unified error handling surface. Each variant
/// maps to one failure class; validation failures (`Parameter`) are raised
/// before any mutation or network call.
#[derive(Debug, Error)]
pub enum CoffreError {
    /// A user-supplied value is malformed (alias, amount, UTXO spec,
    /// hex field, address reference, mnemonic length).
    #[error("invalid parameter: {reason}")]
    Parameter {
        /// Human-readable description of the rejected value.
        reason: String,
    },

    /// A vault or mnemonic passphrase check failed.
    ///
    /// Deliberately carries no detail: the message never reveals whether
    /// a secret record existed or which comparison failed.
    #[error("authentication failed: incorrect passphrase")]
    Authentication,

    /// Persisted storage is unreadable, corrupt, or unreachable
    /// (missing home directory, denied lock, malformed collection file).
    #[error("persistence error: {reason}")]
    Persistence {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// An encrypted envelope could not be opened.
    ///
    /// A failed authentication tag (wrong passphrase and tampering are
    /// indistinguishable) and an unrecognized envelope format both
    /// land here.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Generic description; tag failures all share one message.
        reason: String,
    },

    /// Transaction signing or post-sign signature verification failed.
    #[error("signing error: {reason}")]
    Signing {
        /// Human-readable description of the signing failure.
        reason: String,
    },

    /// A broadcast provider rejected the transaction or was unreachable.
    /// Provider responses surface verbatim and are never retried.
    #[error("provider error: {reason}")]
    Provider {
        /// Transport error or the provider's verbatim response.
        reason: String,
    },
}

impl CoffreError {
    /// Shorthand for a [`CoffreError::Parameter`] with a formatted reason.
    pub fn parameter(reason: impl Into<String>) -> Self {
        Self::Parameter {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CoffreError::Persistence`] with a formatted reason.
    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`CoffreError`].
pub type Result<T> = std::result::Result<T, CoffreError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
