//! Authenticated-encryption envelope for at-rest JSON blobs.
//!
//! An [`Envelope`] is a self-describing container: the KDF and cipher
//! parameters used to produce it travel alongside the ciphertext, so
//! future parameter tuning does not break old data. The key is derived
//! from a user passphrase via scrypt (memory-hard) and the payload is
//! sealed with AES-256-GCM.
//!
//! # Wire shape (JSON)
//!
//! ```json
//! {
//!   "version": 1,
//!   "kdf": { "name": "scrypt", "N": 16384, "r": 8, "p": 1, "keyLength": 32 },
//!   "cipher": { "name": "aes-256-gcm", "keyLength": 32 },
//!   "salt": "<hex 16 bytes>",
//!   "iv": "<hex 12 bytes>",
//!   "tag": "<hex 16 bytes>",
//!   "ciphertext": "<hex variable>"
//! }
//! ```
//!
//! Hard invariant: an IV is generated fresh from OS entropy on every
//! [`encrypt`] call and is never caller-supplied, so an IV+key pair can
//! never repeat.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use coffre_types::{CoffreError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// KDF name recognized by this codec.
const KDF_NAME: &str = "scrypt";

/// Cipher name recognized by this codec.
const CIPHER_NAME: &str = "aes-256-gcm";

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// IV (GCM nonce) length in bytes.
const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Derived key length in bytes (AES-256).
const KEY_LEN: usize = 32;

/// Defensive cap on scrypt working memory: `N * r * 128` bytes.
///
/// Envelope parameters are attacker-controlled on decrypt; without this
/// bound a hostile envelope could demand gigabytes before the tag check
/// ever runs.
const MAX_KDF_MEMORY: u64 = 128 * 1024 * 1024;

/// One generic message for every tag failure. A wrong passphrase and a
/// tampered ciphertext must be indistinguishable to the caller.
const TAG_FAILURE: &str = "wrong passphrase or corrupted data";

// ---------------------------------------------------------------------------
// Parameter blocks
// ---------------------------------------------------------------------------

/// scrypt parameters recorded in the envelope.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfParams {
    /// KDF algorithm name. Only `"scrypt"` is recognized.
    pub name: String,
    /// CPU/memory cost. Must be a power of two.
    #[serde(rename = "N")]
    pub n: u64,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
    /// Derived key length in bytes.
    #[serde(rename = "keyLength")]
    pub key_length: usize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            name: KDF_NAME.into(),
            n: 16_384,
            r: 8,
            p: 1,
            key_length: KEY_LEN,
        }
    }
}

/// Cipher parameters recorded in the envelope.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CipherParams {
    /// AEAD algorithm name. Only `"aes-256-gcm"` is recognized.
    pub name: String,
    /// Key length in bytes.
    #[serde(rename = "keyLength")]
    pub key_length: usize,
}

impl Default for CipherParams {
    fn default() -> Self {
        Self {
            name: CIPHER_NAME.into(),
            key_length: KEY_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Versioned authenticated-encryption container.
///
/// All binary fields are hex-encoded so the envelope serializes to plain
/// JSON and survives any text-safe transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Format version; see [`ENVELOPE_VERSION`].
    pub version: u32,
    /// Key-derivation parameters used to seal this envelope.
    pub kdf: KdfParams,
    /// Cipher parameters used to seal this envelope.
    pub cipher: CipherParams,
    /// Hex-encoded 16-byte scrypt salt.
    pub salt: String,
    /// Hex-encoded 12-byte GCM IV.
    pub iv: String,
    /// Hex-encoded 16-byte GCM authentication tag.
    pub tag: String,
    /// Hex-encoded ciphertext (tag excluded).
    pub ciphertext: String,
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// 256-bit key derived by scrypt, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey([u8; KEY_LEN]);

/// Derives the AES key from a passphrase under the envelope's parameters.
///
/// Rejects parameters that are not a power of two, out of scrypt's valid
/// range, or that would exceed [`MAX_KDF_MEMORY`].
fn derive_key(passphrase: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    if params.key_length != KEY_LEN {
        return Err(CoffreError::Decryption {
            reason: format!(
                "unsupported key length {} (expected {KEY_LEN})",
                params.key_length
            ),
        });
    }

    if !params.n.is_power_of_two() || params.n < 2 {
        return Err(CoffreError::Decryption {
            reason: format!("invalid scrypt cost N={}", params.n),
        });
    }

    let memory = params.n.saturating_mul(params.r as u64).saturating_mul(128);
    if memory > MAX_KDF_MEMORY {
        return Err(CoffreError::Decryption {
            reason: format!(
                "scrypt parameters demand {memory} bytes, above the {MAX_KDF_MEMORY} byte cap"
            ),
        });
    }

    let log_n = params.n.trailing_zeros() as u8;
    let scrypt_params = scrypt::Params::new(log_n, params.r, params.p, KEY_LEN)
        .map_err(|e| CoffreError::Decryption {
            reason: format!("invalid scrypt parameters: {e}"),
        })?;

    let mut output = [0u8; KEY_LEN];
    scrypt::scrypt(passphrase.as_bytes(), salt, &scrypt_params, &mut output).map_err(|e| {
        CoffreError::Decryption {
            reason: format!("scrypt derivation failed: {e}"),
        }
    })?;

    Ok(DerivedKey(output))
}

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

/// Seals `plaintext` under `passphrase` into a fresh [`Envelope`].
///
/// # Process
///
/// 1. Generate a 16-byte salt and a 12-byte IV from OS entropy.
/// 2. Derive a 256-bit key via scrypt with the default parameters.
/// 3. Seal with AES-256-GCM; the 16-byte tag is stored separately from
///    the ciphertext.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<Envelope> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let kdf = KdfParams::default();
    let key = derive_key(passphrase, &salt, &kdf)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CoffreError::Decryption {
            reason: "AES-256-GCM encryption failed".into(),
        })?;

    // The aead crate appends the tag; split it out for the wire shape.
    let split = sealed.len() - TAG_LEN;
    let (ciphertext, tag) = sealed.split_at(split);

    Ok(Envelope {
        version: ENVELOPE_VERSION,
        kdf,
        cipher: CipherParams::default(),
        salt: hex::encode(salt),
        iv: hex::encode(iv),
        tag: hex::encode(tag),
        ciphertext: hex::encode(ciphertext),
    })
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

/// Opens an [`Envelope`] with `passphrase`, returning the plaintext.
///
/// # Errors
///
/// [`CoffreError::Decryption`] if the declared version, KDF, or cipher is
/// unrecognized, if a hex field is malformed, if the KDF parameters fall
/// outside the defensive bounds, or if the authentication tag check fails
/// (wrong passphrase — indistinguishable from tampering, single generic
/// message).
pub fn decrypt(envelope: &Envelope, passphrase: &str) -> Result<Vec<u8>> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(CoffreError::Decryption {
            reason: format!("unsupported envelope version {}", envelope.version),
        });
    }
    if envelope.kdf.name != KDF_NAME {
        return Err(CoffreError::Decryption {
            reason: format!("unsupported KDF '{}'", envelope.kdf.name),
        });
    }
    if envelope.cipher.name != CIPHER_NAME || envelope.cipher.key_length != KEY_LEN {
        return Err(CoffreError::Decryption {
            reason: format!("unsupported cipher '{}'", envelope.cipher.name),
        });
    }

    let salt = decode_field(&envelope.salt, "salt", SALT_LEN)?;
    let iv = decode_field(&envelope.iv, "iv", IV_LEN)?;
    let tag = decode_field(&envelope.tag, "tag", TAG_LEN)?;
    let ciphertext = hex::decode(&envelope.ciphertext).map_err(|_| CoffreError::Decryption {
        reason: "malformed ciphertext hex".into(),
    })?;

    let key = derive_key(passphrase, &salt, &envelope.kdf)?;

    // Reassemble ciphertext || tag for the aead crate.
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: &[],
            },
        )
        .map_err(|_| CoffreError::Decryption {
            reason: TAG_FAILURE.into(),
        })
}

/// Decodes a fixed-length hex field, mapping failures to [`CoffreError::Decryption`].
fn decode_field(hex_str: &str, field: &str, expected: usize) -> Result<Vec<u8>> {
    let bytes = hex::decode(hex_str).map_err(|_| CoffreError::Decryption {
        reason: format!("malformed {field} hex"),
    })?;
    if bytes.len() != expected {
        return Err(CoffreError::Decryption {
            reason: format!("{field} must be {expected} bytes, got {}", bytes.len()),
        });
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
