//! Chain-specific address material.
//!
//! Addresses are derived, never stored: rehydrating a wallet re-runs
//! derivation so key material is always a pure function of
//! (mnemonic, passphrase, chain path, index).

use coffre_crypto::derive::{BtcKeys, EthKeys};

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The two chains every account derives for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Chain {
    Eth,
    Btc,
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Eth => write!(f, "ETH"),
            Chain::Btc => write!(f, "BTC"),
        }
    }
}

// ---------------------------------------------------------------------------
// Address variants
// ---------------------------------------------------------------------------

/// An Ethereum address with its derived key material.
#[derive(Clone)]
pub struct EthAddress {
    /// Account alias this address belongs to.
    pub alias: String,
    pub keys: EthKeys,
}

impl EthAddress {
    /// The 0x-prefixed address string.
    pub fn address(&self) -> &str {
        &self.keys.address
    }
}

/// A Bitcoin native-SegWit address with its derived key material.
#[derive(Clone)]
pub struct BtcAddress {
    /// Account alias this address belongs to.
    pub alias: String,
    pub keys: BtcKeys,
}

impl BtcAddress {
    /// The bech32 address string.
    pub fn address(&self) -> &str {
        &self.keys.address
    }
}

/// Either chain's address, for chain-filtered listing and dispatch.
///
/// Signing is a per-variant capability: only the Bitcoin variant can
/// sign transactions, and the assembler rejects the Ethereum variant
/// at the call site.
#[derive(Clone)]
pub enum ChainAddress {
    Eth(EthAddress),
    Btc(BtcAddress),
}

impl ChainAddress {
    pub fn chain(&self) -> Chain {
        match self {
            ChainAddress::Eth(_) => Chain::Eth,
            ChainAddress::Btc(_) => Chain::Btc,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            ChainAddress::Eth(a) => &a.alias,
            ChainAddress::Btc(a) => &a.alias,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            ChainAddress::Eth(a) => a.address(),
            ChainAddress::Btc(a) => a.address(),
        }
    }

    pub fn public_key(&self) -> &str {
        match self {
            ChainAddress::Eth(a) => &a.keys.public_key,
            ChainAddress::Btc(a) => &a.keys.public_key,
        }
    }
}
