//! BIP39 mnemonic generation, import, and seed derivation.
//!
//! A [`Mnemonic`] pairs a validated word sequence with an optional
//! secret passphrase (the BIP39 "25th word"). It exists only in memory
//! during an unlocked session and is zeroized on drop; persistence
//! always goes through the redacted stored form owned by the wallet
//! crate.

use bip39::Language;
use coffre_types::{CoffreError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Word count / entropy mapping
// ---------------------------------------------------------------------------

/// Supported mnemonic lengths and their entropy sizes in bits.
///
/// 12/15/18/21/24 words ↔ 128/160/192/224/256 bits per BIP39.
pub const SUPPORTED_WORD_COUNTS: [(usize, usize); 5] =
    [(12, 128), (15, 160), (18, 192), (21, 224), (24, 256)];

/// Maps a target word count to its entropy size in bytes.
fn entropy_bytes_for(word_count: usize) -> Result<usize> {
    SUPPORTED_WORD_COUNTS
        .iter()
        .find(|(words, _)| *words == word_count)
        .map(|(_, bits)| bits / 8)
        .ok_or_else(|| {
            CoffreError::parameter(format!(
                "unsupported mnemonic length {word_count} (expected 12, 15, 18, 21, or 24)"
            ))
        })
}

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// A validated BIP39 mnemonic with an optional passphrase.
///
/// Both fields are scrubbed from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    words: String,
    passphrase: Option<String>,
}

impl Mnemonic {
    /// Imports an existing mnemonic, validating words and checksum.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] if the phrase is not a valid BIP39
    /// mnemonic (unknown word, bad word count, checksum mismatch).
    pub fn import(words: &str, passphrase: Option<String>) -> Result<Self> {
        let parsed = bip39::Mnemonic::parse_in_normalized(Language::English, words)
            .map_err(|e| CoffreError::parameter(format!("invalid mnemonic: {e}")))?;
        Ok(Self {
            words: parsed.to_string(),
            passphrase: normalize_passphrase(passphrase),
        })
    }

    /// Generates a fresh mnemonic of `word_count` words from OS entropy.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] for word counts outside
    /// [`SUPPORTED_WORD_COUNTS`].
    pub fn generate(word_count: usize, passphrase: Option<String>) -> Result<Self> {
        // Validate the count up front so the error names the parameter
        // rather than surfacing as a library entropy error.
        entropy_bytes_for(word_count)?;

        let generated = bip39::Mnemonic::generate_in(Language::English, word_count)
            .map_err(|e| CoffreError::parameter(format!("mnemonic generation failed: {e}")))?;
        Ok(Self {
            words: generated.to_string(),
            passphrase: normalize_passphrase(passphrase),
        })
    }

    /// Builds a mnemonic from explicit entropy bytes; the word count
    /// follows from the entropy length.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] for entropy sizes other than
    /// 16/20/24/28/32 bytes.
    pub fn from_entropy(entropy: &[u8], passphrase: Option<String>) -> Result<Self> {
        let supported = SUPPORTED_WORD_COUNTS
            .iter()
            .any(|(_, bits)| bits / 8 == entropy.len());
        if !supported {
            return Err(CoffreError::parameter(format!(
                "unsupported entropy size {} bytes (expected 16, 20, 24, 28, or 32)",
                entropy.len()
            )));
        }

        let built = bip39::Mnemonic::from_entropy_in(Language::English, entropy)
            .map_err(|e| CoffreError::parameter(format!("invalid entropy: {e}")))?;
        Ok(Self {
            words: built.to_string(),
            passphrase: normalize_passphrase(passphrase),
        })
    }

    /// Returns the space-separated word sequence.
    pub fn words(&self) -> &str {
        &self.words
    }

    /// Returns the number of words.
    pub fn word_count(&self) -> usize {
        self.words.split_whitespace().count()
    }

    /// Returns the optional mnemonic passphrase.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// Whether a passphrase is attached.
    pub fn has_passphrase(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Replaces the attached passphrase (used when rehydrating a stored
    /// wallet after the digest check).
    pub fn set_passphrase(&mut self, passphrase: Option<String>) {
        self.passphrase.zeroize();
        self.passphrase = normalize_passphrase(passphrase);
    }

    /// Derives the 64-byte BIP39 seed (PBKDF2-HMAC-SHA512, 2048 rounds,
    /// salt `"mnemonic" + passphrase`).
    ///
    /// Identical `(words, passphrase)` always yields an identical seed.
    pub fn seed(&self) -> Result<[u8; 64]> {
        let parsed = bip39::Mnemonic::parse_in_normalized(Language::English, &self.words)
            .map_err(|e| CoffreError::parameter(format!("invalid mnemonic: {e}")))?;
        Ok(parsed.to_seed(self.passphrase.as_deref().unwrap_or("")))
    }
}

/// Treats an empty passphrase as absent so `Some("")` and `None` derive
/// the same keys and serialize the same way.
fn normalize_passphrase(passphrase: Option<String>) -> Option<String> {
    passphrase.filter(|p| !p.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// BIP39 mnemonic from all-zero 128-bit entropy.
    const MNEMONIC_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn generate_supported_word_counts() -> Result<()> {
        for (words, _) in SUPPORTED_WORD_COUNTS {
            let m = Mnemonic::generate(words, None)?;
            assert_eq!(m.word_count(), words);
        }
        Ok(())
    }

    #[test]
    fn generate_rejects_unsupported_count() {
        for bad in [0, 1, 11, 13, 23, 25] {
            assert!(
                matches!(
                    Mnemonic::generate(bad, None),
                    Err(CoffreError::Parameter { .. })
                ),
                "word count {bad} should be rejected"
            );
        }
    }

    #[test]
    fn entropy_length_determines_word_count() -> Result<()> {
        for (words, bits) in SUPPORTED_WORD_COUNTS {
            let entropy = vec![0xA5u8; bits / 8];
            let m = Mnemonic::from_entropy(&entropy, None)?;
            assert_eq!(m.word_count(), words);
        }
        Ok(())
    }

    #[test]
    fn from_entropy_rejects_odd_sizes() {
        for bad in [0usize, 15, 17, 33, 64] {
            let entropy = vec![0u8; bad];
            assert!(Mnemonic::from_entropy(&entropy, None).is_err());
        }
    }

    /// All-zero 128-bit entropy is the canonical "abandon … about" phrase.
    #[test]
    fn zero_entropy_vector() -> Result<()> {
        let m = Mnemonic::from_entropy(&[0u8; 16], None)?;
        assert_eq!(m.words(), MNEMONIC_12);
        Ok(())
    }

    #[test]
    fn import_validates_checksum() {
        // 12 × "abandon" has a wrong checksum (must end in "about").
        let bad = "abandon abandon abandon abandon abandon abandon \
                   abandon abandon abandon abandon abandon abandon";
        assert!(matches!(
            Mnemonic::import(bad, None),
            Err(CoffreError::Parameter { .. })
        ));
    }

    #[test]
    fn import_rejects_unknown_word() {
        let bad = MNEMONIC_12.replace("about", "xyzzy");
        assert!(Mnemonic::import(&bad, None).is_err());
    }

    /// TREZOR BIP39 vector: all-zero entropy, passphrase "TREZOR".
    #[test]
    fn seed_trezor_vector() -> Result<()> {
        let m = Mnemonic::import(MNEMONIC_12, Some("TREZOR".into()))?;
        let seed = m.seed()?;
        assert_eq!(
            hex::encode(seed),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
        Ok(())
    }

    #[test]
    fn empty_passphrase_equivalent_to_none() -> Result<()> {
        let bare = Mnemonic::import(MNEMONIC_12, None)?;
        let empty = Mnemonic::import(MNEMONIC_12, Some(String::new()))?;
        assert!(!empty.has_passphrase());
        assert_eq!(bare.seed()?, empty.seed()?);
        Ok(())
    }

    #[test]
    fn passphrase_changes_seed() -> Result<()> {
        let bare = Mnemonic::import(MNEMONIC_12, None)?;
        let guarded = Mnemonic::import(MNEMONIC_12, Some("secret".into()))?;
        assert_ne!(bare.seed()?, guarded.seed()?);
        Ok(())
    }

    #[test]
    fn seed_is_deterministic() -> Result<()> {
        let m = Mnemonic::import(MNEMONIC_12, Some("p".into()))?;
        assert_eq!(m.seed()?, m.seed()?);
        Ok(())
    }

    #[test]
    fn two_generated_mnemonics_differ() -> Result<()> {
        let a = Mnemonic::generate(24, None)?;
        let b = Mnemonic::generate(24, None)?;
        assert_ne!(a.words(), b.words());
        Ok(())
    }
}
